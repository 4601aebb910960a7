//! # Folio Editor
//!
//! A single-writer editing session over a [`folio_model::Document`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ folio-model: tree, operations, transforms   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ folio-editor: Editor session                │
//! │  - Apply operations, keep a dispatch log    │
//! │  - Keep path/point/range refs current       │
//! │  - Normalize against a schema               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the only way in**: the session never edits its tree
//!    directly
//! 2. **Atomic apply**: a rejected operation changes nothing
//! 3. **Repairs are operations**: normalization goes through `apply` like any
//!    other edit, so references and the log see it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_editor::{ChildRepair, Constraint, Editor, Matcher, Rule, Schema};
//! use folio_model::{Document, Node, Operation, Path};
//!
//! let schema = Schema::new(vec![Rule::new(
//!     "quote-paragraphs",
//!     Matcher::kind("quote"),
//!     Constraint::Children { allowed: Matcher::kind("paragraph"), repair: ChildRepair::Remove },
//! )]);
//! let mut editor = Editor::new(Document::default()).with_schema(schema);
//!
//! editor.apply(Operation::InsertNode {
//!     path: Path::from([0]),
//!     node: Node::element("paragraph", vec![Node::text("hello")]),
//! })?;
//! let cursor = editor.point_ref(editor.end(Path::root())?, Default::default());
//! ```

mod config;
mod editor;
mod errors;
mod normalize;
mod refs;
pub mod schema;

pub use config::{EditorConfig, DEFAULT_CONFIG_NAME, DEFAULT_ITERATION_FACTOR};
pub use editor::{Edge, Editor};
pub use errors::{EditorError, EditorResult};
pub use refs::{PathRef, PointRef, RangeRef, RefId};
pub use schema::{ChildRepair, Constraint, CustomRule, Matcher, Rule, Schema, Violation, ViolationKind};

// Re-export the model for convenience
pub use folio_model;
