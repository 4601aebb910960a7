//! Editor configuration, read from `folio.config.json`

use crate::errors::{EditorError, EditorResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Normalization passes allowed per initially dirty path
pub const DEFAULT_ITERATION_FACTOR: usize = 42;

/// Session configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// The normalization loop gives up after `dirty paths × factor` passes
    #[serde(default = "default_iteration_factor")]
    pub normalize_iteration_factor: usize,

    /// Fixed pass limit, overriding the factor when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_normalize_iterations: Option<usize>,

    /// Normalize after every `apply` outside of `without_normalizing`
    #[serde(default = "default_true")]
    pub normalize_on_apply: bool,

    /// Log every applied operation at debug level
    #[serde(default)]
    pub log_operations: bool,
}

fn default_iteration_factor() -> usize {
    DEFAULT_ITERATION_FACTOR
}

fn default_true() -> bool {
    true
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: impl Into<PathBuf>) -> EditorResult<Self> {
        let config_path = dir.into().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(EditorConfig::default())
        }
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EditorResult<()> {
        if self.normalize_iteration_factor == 0 {
            return Err(EditorError::Config(
                "normalizeIterationFactor must be at least 1".to_string(),
            ));
        }
        if self.max_normalize_iterations == Some(0) {
            return Err(EditorError::Config(
                "maxNormalizeIterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pass limit for a loop that started with `dirty` paths
    pub fn iteration_cap(&self, dirty: usize) -> usize {
        self.max_normalize_iterations
            .unwrap_or_else(|| dirty.saturating_mul(self.normalize_iteration_factor))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            normalize_iteration_factor: DEFAULT_ITERATION_FACTOR,
            max_normalize_iterations: None,
            normalize_on_apply: true,
            log_operations: false,
        }
    }
}
