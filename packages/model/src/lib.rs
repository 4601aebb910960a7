//! # Folio Model
//!
//! The value types of a structured rich-text document and the primitive
//! operations that change it.
//!
//! - [`Path`], [`Point`], [`Range`]: addresses into the tree
//! - [`Document`], [`Element`], [`Text`]: the tree itself
//! - [`Operation`]: the nine invertible edits
//! - [`transform`]: rebasing stored locations through an edit
//!
//! Nothing here keeps session state; see `folio-editor` for that.

pub mod error;
pub mod node;
pub mod nodes;
pub mod operation;
pub mod path;
pub mod point;
pub mod range;
pub mod text;
pub mod transform;

pub use error::{ModelResult, StructuralError};
pub use node::{apply_patch, diff_attributes, Attributes, Document, Element, Node, NodeEntry, NodeRef, PropertyPatch, Text, TYPE_KEY};
pub use nodes::{Location, Nodes, NodesOptions};
pub use operation::{Operation, SelectionPatch};
pub use path::Path;
pub use point::Point;
pub use range::{Range, Target};
pub use text::utf16_len;
pub use transform::{transform_path, transform_point, transform_range, Affinity, RangeAffinity};
