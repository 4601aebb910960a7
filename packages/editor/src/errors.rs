//! Error types for the editor

use folio_model::StructuralError;
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Normalization did not converge after {iterations} iterations (last rule: {rule})")]
    SchemaNonconvergence { rule: String, iterations: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
