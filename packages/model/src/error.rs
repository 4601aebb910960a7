use crate::path::Path;
use thiserror::Error;

pub type ModelResult<T> = Result<T, StructuralError>;

/// An operation or query that does not fit the current tree.
///
/// These are programmer errors: the operation was built against a different
/// tree shape than the one it was applied to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Node not found at path {0}")]
    NodeNotFound(Path),

    #[error("Node at path {0} is not a text leaf")]
    NotText(Path),

    #[error("Node at path {0} is not an element")]
    NotElement(Path),

    #[error("Cannot {0} the root node")]
    RootOperation(&'static str),

    #[error("Offset {offset} is not a valid position in the text at {path}")]
    InvalidOffset { path: Path, offset: usize },

    #[error("Position {position} is out of bounds for the node at {path}")]
    InvalidPosition { path: Path, position: usize },

    #[error("Cannot split void node at {0}")]
    VoidSplit(Path),

    #[error("Cannot edit {0} inside a void element")]
    VoidDescendant(Path),

    #[error("Node at path {0} has no previous sibling to merge into")]
    NoPreviousSibling(Path),

    #[error("Cannot merge node at {0} into a sibling of a different kind")]
    MergeMismatch(Path),

    #[error("Removed text {expected:?} does not match {found:?} at {path}")]
    TextMismatch {
        path: Path,
        expected: String,
        found: String,
    },

    #[error("Cannot move node at {path} into its own subtree at {new_path}")]
    MoveIntoSelf { path: Path, new_path: Path },

    #[error("Only elements may be children of the root, found text at {0}")]
    InvalidRootChild(Path),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}

impl StructuralError {
    pub fn invalid_offset(path: &Path, offset: usize) -> Self {
        Self::InvalidOffset {
            path: path.clone(),
            offset,
        }
    }

    pub fn invalid_position(path: &Path, position: usize) -> Self {
        Self::InvalidPosition {
            path: path.clone(),
            position,
        }
    }

    pub fn invalid_selection(message: impl Into<String>) -> Self {
        Self::InvalidSelection(message.into())
    }
}
