//! # Editing Session
//!
//! An [`Editor`] owns one document and everything that has to stay in step
//! with it: the dispatch log, live references, the dirty set and the schema.
//!
//! ## Lifecycle of an operation
//!
//! ```text
//! apply(op)
//!   ├─ op.apply(document)      fails here → nothing changed
//!   ├─ refs.transform(op)
//!   ├─ dirty.transform(op) + dirty_paths_for(op)
//!   ├─ operations.push(op)
//!   └─ normalize()             unless suspended or already running
//! ```
//!
//! Repairs made by the normalization loop come back through `apply`, so the
//! log records them too and references follow them.

use crate::config::EditorConfig;
use crate::errors::EditorResult;
use crate::normalize::{dirty_paths_for, DirtyPaths};
use crate::refs::{PathRef, PointRef, RangeRef, RefRegistry, Tracked};
use crate::schema::Schema;
use folio_model::{
    Affinity, Document, Location, NodeEntry, NodeRef, Nodes, NodesOptions, Operation, Path, Point, Range, RangeAffinity,
};
use std::sync::Arc;
use tracing::{debug, trace};

/// Which end of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// Single-writer editing session
pub struct Editor {
    pub(crate) document: Document,
    operations: Vec<Operation>,
    refs: RefRegistry,
    pub(crate) dirty: DirtyPaths,
    pub(crate) schema: Arc<Schema>,
    pub(crate) config: EditorConfig,
    pub(crate) normalizing: bool,
}

impl Editor {
    /// Session over `document` with the core rules and default config.
    ///
    /// The document is taken as is; call `normalize(true)` to repair it.
    pub fn new(document: Document) -> Self {
        Self {
            document,
            operations: Vec::new(),
            refs: RefRegistry::default(),
            dirty: DirtyPaths::default(),
            schema: Arc::new(Schema::core()),
            config: EditorConfig::default(),
            normalizing: true,
        }
    }

    /// Register user rules. They run ahead of the core rules, so the first
    /// match is always the most specific one.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        let mut rules = schema;
        rules.extend(Schema::core());
        self.schema = Arc::new(rules);
        self
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn selection(&self) -> Option<&Range> {
        self.document.selection.as_ref()
    }

    /// Apply an operation, then normalize unless normalization is suspended.
    ///
    /// A structural failure leaves the document, log and references as they
    /// were. A normalization failure leaves `op` and every repair made before
    /// the failure applied. The paths it could not repair stay dirty, so the
    /// next `apply` commits its operation and then fails the same way until
    /// the schema converges or [`Editor::clear_dirty_paths`] drops them.
    pub fn apply(&mut self, op: Operation) -> EditorResult<()> {
        op.apply(&mut self.document)?;

        if self.config.log_operations {
            debug!(op = op.name(), path = ?op.path(), "applied operation");
        } else {
            trace!(op = op.name(), path = ?op.path(), "applied operation");
        }

        self.refs.transform(&op);
        self.dirty.transform(&op);
        self.dirty.extend(dirty_paths_for(&op));
        self.operations.push(op);

        if self.normalizing && self.config.normalize_on_apply {
            self.normalize(false)?;
        }
        Ok(())
    }

    /// Every operation applied since the last [`Editor::take_operations`]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Drain the dispatch log
    pub fn take_operations(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.operations)
    }

    // Queries

    pub fn get(&self, path: &Path) -> EditorResult<NodeRef<'_>> {
        Ok(self.document.get(path)?)
    }

    pub fn has(&self, path: &Path) -> bool {
        self.document.has(path)
    }

    pub fn parent(&self, path: &Path) -> EditorResult<NodeEntry<'_>> {
        let node = self.document.parent(path)?;
        let parent = path.parent().unwrap_or_default();
        Ok((node, parent))
    }

    /// Next sibling, if any
    pub fn next(&self, path: &Path) -> Option<NodeEntry<'_>> {
        self.document.next_sibling(path)
    }

    /// Previous sibling, if any
    pub fn previous(&self, path: &Path) -> Option<NodeEntry<'_>> {
        self.document.previous_sibling(path)
    }

    /// Ancestors of `path`, root first
    pub fn ancestors(&self, path: &Path) -> EditorResult<Vec<NodeEntry<'_>>> {
        Ok(self.document.ancestors(path)?)
    }

    pub fn nodes<'a>(&self, options: NodesOptions<'a>) -> Nodes<'_, 'a> {
        self.document.nodes(options)
    }

    pub fn start(&self, at: impl Into<Location>) -> EditorResult<Point> {
        self.point(at, Edge::Start)
    }

    pub fn end(&self, at: impl Into<Location>) -> EditorResult<Point> {
        self.point(at, Edge::End)
    }

    /// Start and end points of a location
    pub fn edges(&self, at: impl Into<Location>) -> EditorResult<(Point, Point)> {
        let range = self.range(at)?;
        Ok((range.start().clone(), range.end().clone()))
    }

    pub fn point(&self, at: impl Into<Location>, edge: Edge) -> EditorResult<Point> {
        let point = match (at.into(), edge) {
            (Location::Path(path), Edge::Start) => self.document.start(&path)?,
            (Location::Path(path), Edge::End) => self.document.end(&path)?,
            (Location::Point(point), _) => point,
            (Location::Range(range), Edge::Start) => range.start().clone(),
            (Location::Range(range), Edge::End) => range.end().clone(),
        };
        Ok(point)
    }

    /// Range spanning a location; a point becomes a collapsed range
    pub fn range(&self, at: impl Into<Location>) -> EditorResult<Range> {
        let range = match at.into() {
            Location::Path(path) => self.document.range(&path)?,
            Location::Point(point) => Range::collapsed(point),
            Location::Range(range) => range,
        };
        Ok(range)
    }

    // Selection

    /// Replace the selection through a `set_selection` operation
    pub fn select(&mut self, at: impl Into<Location>) -> EditorResult<()> {
        let range = self.range(at)?;
        let op = Operation::select(&self.document, &range);
        self.apply(op)
    }

    pub fn deselect(&mut self) -> EditorResult<()> {
        if self.document.selection.is_none() {
            return Ok(());
        }
        let op = Operation::deselect(&self.document);
        self.apply(op)
    }

    // References

    /// Track a path through future operations.
    ///
    /// With [`Affinity::Forward`] the ref keeps naming the slot, so a node
    /// inserted exactly at `path` takes it over. Use [`Affinity::Backward`]
    /// to follow the node currently at `path` instead.
    pub fn path_ref(&mut self, path: Path, affinity: Affinity) -> PathRef {
        PathRef::new(self.refs.insert(Tracked::Path {
            value: Some(path),
            affinity,
        }))
    }

    pub fn point_ref(&mut self, point: Point, affinity: Affinity) -> PointRef {
        PointRef::new(self.refs.insert(Tracked::Point {
            value: Some(point),
            affinity,
        }))
    }

    pub fn range_ref(&mut self, range: Range, affinity: RangeAffinity) -> RangeRef {
        RangeRef::new(self.refs.insert(Tracked::Range {
            value: Some(range),
            affinity,
        }))
    }

    /// Number of registered references
    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    pub(crate) fn refs(&self) -> &RefRegistry {
        &self.refs
    }

    pub(crate) fn refs_mut(&mut self) -> &mut RefRegistry {
        &mut self.refs
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("document", &self.document)
            .field("operations", &self.operations.len())
            .field("refs", &self.refs.len())
            .field("dirty", &self.dirty.len())
            .field("rules", &self.schema.rules().len())
            .field("normalizing", &self.normalizing)
            .finish()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::default())
    }
}
