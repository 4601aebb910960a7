//! # Normalization
//!
//! Keeps the document valid against the editor's [`Schema`] by repairing
//! violations until none are left.
//!
//! ## Design
//!
//! Every applied operation marks the paths it could have invalidated as dirty
//! (never the whole tree). The loop pops the most recently marked path, runs
//! the rules against the node there, and repairs the first violation. A
//! repair is an ordinary operation, so it marks its own paths dirty and the
//! loop keeps going until the set drains.
//!
//! ```text
//! apply(op) ──► dirty += paths(op) ──► pop ──► first violation? ──► repair
//!                   ▲                                                 │
//!                   └─────────────────── apply(repair op) ◄───────────┘
//! ```
//!
//! A schema whose repairs undo each other would spin forever, so the loop is
//! capped at `initial dirty count × normalizeIterationFactor` passes and fails
//! with [`EditorError::SchemaNonconvergence`] past that.

use crate::editor::Editor;
use crate::errors::{EditorError, EditorResult};
use crate::schema::{repair_operations, Constraint, Rule, Schema, Violation};
use folio_model::{transform_path, Affinity, Node, NodesOptions, Operation, Path};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Insertion-ordered set of paths waiting to be checked
#[derive(Debug, Clone, Default)]
pub(crate) struct DirtyPaths {
    paths: Vec<Path>,
    keys: HashSet<Path>,
}

impl DirtyPaths {
    pub fn insert(&mut self, path: Path) {
        if self.keys.insert(path.clone()) {
            self.paths.push(path);
        }
    }

    pub fn extend(&mut self, paths: impl IntoIterator<Item = Path>) {
        for path in paths {
            self.insert(path);
        }
    }

    /// Most recently marked path
    pub fn pop(&mut self) -> Option<Path> {
        let path = self.paths.pop()?;
        self.keys.remove(&path);
        Some(path)
    }

    /// Re-address pending paths after `op`; deleted ones are dropped
    pub fn transform(&mut self, op: &Operation) {
        if !op.is_structural() {
            return;
        }
        let pending = std::mem::take(&mut self.paths);
        self.keys.clear();
        self.extend(
            pending
                .iter()
                .filter_map(|path| transform_path(path, op, Affinity::Backward)),
        );
    }

    /// Forget every pending path
    pub fn clear(&mut self) -> Vec<Path> {
        self.keys.clear();
        std::mem::take(&mut self.paths)
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Paths whose nodes may no longer satisfy the schema after `op`
pub(crate) fn dirty_paths_for(op: &Operation) -> Vec<Path> {
    match op {
        Operation::InsertText { path, .. }
        | Operation::RemoveText { path, .. }
        | Operation::SetNode { path, .. } => path.levels(),

        Operation::InsertNode { path, node } => {
            let mut paths = path.levels();
            if node.is_element() {
                descendant_paths(node, path.clone(), &mut paths);
            }
            paths
        }

        Operation::SplitNode { path, .. } => {
            let mut paths = path.levels();
            paths.extend(path.next());
            paths
        }

        Operation::MergeNode { path, .. } => {
            let mut paths = path.ancestors();
            paths.extend(path.previous());
            paths
        }

        Operation::MoveNode { path, new_path } => {
            if path == new_path {
                return Vec::new();
            }
            let old_ancestors: Vec<Path> = path
                .ancestors()
                .iter()
                .filter_map(|ancestor| transform_path(ancestor, op, Affinity::Forward))
                .collect();
            let new_ancestors: Vec<Path> = new_path
                .ancestors()
                .iter()
                .filter_map(|ancestor| transform_path(ancestor, op, Affinity::Forward))
                .collect();
            let landed = match (new_ancestors.last(), new_path.last()) {
                (Some(parent), Some(index)) => Some(parent.child(index)),
                _ => None,
            };

            let mut paths = old_ancestors;
            paths.extend(new_ancestors);
            paths.extend(landed);
            paths
        }

        Operation::RemoveNode { path, .. } => path.ancestors(),

        Operation::SetSelection { .. } => Vec::new(),
    }
}

fn descendant_paths(node: &Node, path: Path, out: &mut Vec<Path>) {
    if node.is_void() {
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        let child_path = path.child(index);
        out.push(child_path.clone());
        descendant_paths(child, child_path, out);
    }
}

impl Editor {
    /// Repair dirty paths until the document satisfies the schema.
    ///
    /// `force` marks every node dirty first. Does nothing while a loop is
    /// already running or inside [`Editor::without_normalizing`].
    #[instrument(skip(self), fields(dirty = self.dirty.len()))]
    pub fn normalize(&mut self, force: bool) -> EditorResult<()> {
        if !self.normalizing {
            return Ok(());
        }
        if force {
            let all: Vec<Path> = self
                .document
                .nodes(NodesOptions::default())
                .map(|(_, path)| path)
                .collect();
            self.dirty.extend(all);
        }
        if self.dirty.is_empty() {
            return Ok(());
        }

        self.normalizing = false;
        let result = self.drain_dirty();
        self.normalizing = true;
        result
    }

    fn drain_dirty(&mut self) -> EditorResult<()> {
        let schema: Arc<Schema> = Arc::clone(&self.schema);
        let cap = self.config.iteration_cap(self.dirty.len());
        let mut iterations = 0;
        let mut last_rule: Option<String> = None;

        while !self.dirty.is_empty() {
            if iterations > cap {
                let rule = last_rule.unwrap_or_else(|| "unknown".to_string());
                warn!(rule = %rule, iterations, "normalization did not converge");
                return Err(EditorError::SchemaNonconvergence { rule, iterations });
            }

            let Some(path) = self.dirty.pop() else {
                break;
            };
            if let Some(void) = self.document.void_ancestor(&path) {
                trace!(path = %path, void = %void, "dirty path is inside a void");
            } else if let Ok(node) = self.document.get(&path) {
                if let Some((rule, violation)) = schema.first_violation(&self.document, node, &path) {
                    debug!(rule = %rule.name, path = %path, %violation, "repairing violation");
                    last_rule = Some(rule.name.clone());
                    self.repair(rule, &violation)?;
                }
            } else {
                trace!(path = %path, "dirty path no longer resolves");
            }
            iterations += 1;
        }

        debug!(iterations, "normalization converged");
        Ok(())
    }

    fn repair(&mut self, rule: &Rule, violation: &Violation) -> EditorResult<()> {
        if let Constraint::Custom { rule } = &rule.constraint {
            return rule.normalize(self, violation);
        }
        for op in repair_operations(&self.document, violation)? {
            self.apply(op)?;
        }
        Ok(())
    }

    /// Run `f` with normalization suspended, then normalize once
    pub fn without_normalizing<T>(&mut self, f: impl FnOnce(&mut Editor) -> EditorResult<T>) -> EditorResult<T> {
        let was_normalizing = self.normalizing;
        self.normalizing = false;
        let result = f(self);
        self.normalizing = was_normalizing;

        let value = result?;
        if self.config.normalize_on_apply {
            self.normalize(false)?;
        }
        Ok(value)
    }

    pub fn is_normalizing(&self) -> bool {
        self.normalizing
    }

    /// Turn automatic normalization on or off. Turning it back on does not
    /// normalize by itself; call [`Editor::normalize`].
    pub fn set_normalizing(&mut self, normalizing: bool) {
        self.normalizing = normalizing;
    }

    /// Paths waiting to be checked, oldest first
    pub fn dirty_paths(&self) -> &[Path] {
        self.dirty.paths()
    }

    /// Drop every pending dirty path and return them.
    ///
    /// A loop that failed with [`EditorError::SchemaNonconvergence`] leaves
    /// its remaining paths queued, so every later `apply` runs into the same
    /// rule again. Clearing gives up on repairing them.
    pub fn clear_dirty_paths(&mut self) -> Vec<Path> {
        self.dirty.clear()
    }
}
