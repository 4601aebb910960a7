use folio_model::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What a rule found wrong with a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    TooFewChildren { min: usize, found: usize },
    TooManyChildren { max: usize, found: usize },
    DisallowedChild { index: usize, repair: ChildRepair },
    DisallowedParent,
    AttributeMismatch { key: String, expected: Value },
    /// Non-void element without children
    Empty,
    /// Child at `index` does not match the block/inline level of its siblings
    MixedChildren { index: usize },
    /// An empty text is needed at `index` to pad an inline element
    UnpaddedInline { index: usize },
    /// Text at `index` has the same formatting as the text before it
    MergeableText { index: usize },
    /// Empty text at `index` next to a differently formatted text
    EmptyText { index: usize },
    Custom { message: String },
}

/// How a disallowed child gets repaired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildRepair {
    #[default]
    Remove,
    /// Replace the child with its own children
    Unwrap,
}

/// A rule failure at a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// The rule that reported it
    pub rule: String,

    /// The node the rule was checking
    pub path: Path,

    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(rule: impl Into<String>, path: Path, kind: ViolationKind) -> Self {
        Self {
            rule: rule.into(),
            path,
            kind,
        }
    }

    pub fn custom(rule: impl Into<String>, path: Path, message: impl Into<String>) -> Self {
        Self::new(
            rule,
            path,
            ViolationKind::Custom {
                message: message.into(),
            },
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: ", self.rule, self.path)?;
        match &self.kind {
            ViolationKind::TooFewChildren { min, found } => {
                write!(f, "expected at least {} children, found {}", min, found)
            }
            ViolationKind::TooManyChildren { max, found } => {
                write!(f, "expected at most {} children, found {}", max, found)
            }
            ViolationKind::DisallowedChild { index, .. } => write!(f, "child {} is not allowed here", index),
            ViolationKind::DisallowedParent => write!(f, "parent is not allowed"),
            ViolationKind::AttributeMismatch { key, expected } => {
                write!(f, "attribute '{}' should be {}", key, expected)
            }
            ViolationKind::Empty => write!(f, "element has no children"),
            ViolationKind::MixedChildren { index } => {
                write!(f, "child {} mixes block and inline content", index)
            }
            ViolationKind::UnpaddedInline { index } => {
                write!(f, "inline element needs a text leaf at {}", index)
            }
            ViolationKind::MergeableText { index } => {
                write!(f, "text {} can merge into the previous text", index)
            }
            ViolationKind::EmptyText { index } => write!(f, "empty text {} is redundant", index),
            ViolationKind::Custom { message } => write!(f, "{}", message),
        }
    }
}
