//! # Location Transforms
//!
//! Rebase a path, point or range through an operation so it keeps addressing
//! the same content after the tree changes.
//!
//! ## Affinity
//!
//! When content lands exactly on a tracked location the outcome is ambiguous.
//! [`Affinity::Forward`] keeps the location in front of the new content,
//! [`Affinity::Backward`] lets the new content slide in before it, so the
//! location ends up after it.
//!
//! | operation at the tracked location | `Forward`                | `Backward`                       |
//! |-----------------------------------|--------------------------|----------------------------------|
//! | `insert_text` at the point offset | offset unchanged         | offset += inserted length        |
//! | `split_node` at the point offset  | stays on the leading half | moves to the trailing half      |
//! | `insert_node` at the same path    | addresses the new node   | shifts to keep the existing node |
//!
//! Points always follow the existing node through `insert_node`.

use crate::operation::Operation;
use crate::path::Path;
use crate::point::Point;
use crate::range::Range;
use crate::text::utf16_len;
use serde::{Deserialize, Serialize};

/// Tie-break for edits landing exactly on a tracked location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    /// Stay in front of content inserted at the location
    #[default]
    Forward,
    /// End up after content inserted at the location
    Backward,
}

/// Tie-break for the two edges of a range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeAffinity {
    Forward,
    Backward,
    /// Shrink away from content inserted at the edges
    #[default]
    Inward,
    /// Grow to take in content inserted at the edges
    Outward,
}

/// Per-edge affinities `(anchor, focus)` for a range.
///
/// A collapsed range under `Inward` moves as a single point with `Backward`.
pub(crate) fn edge_affinities(range: &Range, affinity: RangeAffinity) -> (Affinity, Affinity) {
    use Affinity::{Backward, Forward};

    // (start, end) for each mode, then flipped for backward ranges
    let (start, end) = match affinity {
        RangeAffinity::Forward => (Forward, Forward),
        RangeAffinity::Backward => (Backward, Backward),
        RangeAffinity::Inward if range.is_collapsed() => (Backward, Backward),
        RangeAffinity::Inward => (Backward, Forward),
        RangeAffinity::Outward => (Forward, Backward),
    };
    if range.is_backward() {
        (end, start)
    } else {
        (start, end)
    }
}

/// Where a moved node actually lands once it has been detached from `path`
pub(crate) fn move_target(path: &Path, new_path: &Path) -> Path {
    let mut target = new_path.to_vec();
    if path.ends_before(new_path) && path.len() < new_path.len() {
        target[path.len() - 1] -= 1;
    }
    Path::from(target)
}

/// Shift `path` for a node inserted at `at`
fn shift_for_insert(path: &Path, at: &Path, shift_equal: bool) -> Path {
    if at.is_root() {
        return path.clone();
    }
    let mut out = path.to_vec();
    if (at == path && shift_equal) || at.ends_before(path) || at.is_ancestor(path) {
        out[at.len() - 1] += 1;
    }
    Path::from(out)
}

/// Shift `path` for the node at `at` being removed; `None` when it went with it
fn shift_for_remove(path: &Path, at: &Path) -> Option<Path> {
    if at.is_root() {
        return Some(path.clone());
    }
    if at.is_common(path) {
        return None;
    }
    let mut out = path.to_vec();
    if at.ends_before(path) {
        out[at.len() - 1] -= 1;
    }
    Some(Path::from(out))
}

/// Rebase `path` through `op`. Returns `None` when the node was removed.
pub fn transform_path(path: &Path, op: &Operation, affinity: Affinity) -> Option<Path> {
    if path.is_root() {
        return Some(path.clone());
    }

    match op {
        Operation::InsertNode { path: at, .. } => {
            Some(shift_for_insert(path, at, affinity == Affinity::Backward))
        }

        Operation::RemoveNode { path: at, .. } => shift_for_remove(path, at),

        Operation::MergeNode { path: at, position, .. } => {
            if at.is_root() {
                return Some(path.clone());
            }
            let depth = at.len() - 1;
            let mut out = path.to_vec();
            if at == path || at.ends_before(path) {
                out[depth] = out[depth].saturating_sub(1);
            } else if at.is_ancestor(path) {
                out[depth] = out[depth].saturating_sub(1);
                out[at.len()] += position;
            }
            Some(Path::from(out))
        }

        Operation::SplitNode { path: at, position, .. } => {
            if at.is_root() {
                return Some(path.clone());
            }
            let depth = at.len() - 1;
            let mut out = path.to_vec();
            if at == path {
                if affinity == Affinity::Backward {
                    out[depth] += 1;
                }
            } else if at.ends_before(path) {
                out[depth] += 1;
            } else if at.is_ancestor(path) && path[at.len()] >= *position {
                out[depth] += 1;
                out[at.len()] -= position;
            }
            Some(Path::from(out))
        }

        Operation::MoveNode { path: from, new_path } => {
            if from == new_path || from.is_root() || new_path.is_root() {
                return Some(path.clone());
            }
            let target = move_target(from, new_path);
            if from.is_common(path) {
                return Some(target.join(&path[from.len()..]));
            }
            // Any other node sees a removal at `from` followed by an insertion
            // at `target`, landing in front of whatever was there.
            let removed = shift_for_remove(path, from)?;
            Some(shift_for_insert(&removed, &target, true))
        }

        Operation::SetNode { .. }
        | Operation::InsertText { .. }
        | Operation::RemoveText { .. }
        | Operation::SetSelection { .. } => Some(path.clone()),
    }
}

/// Rebase `point` through `op`. Returns `None` when its leaf was removed.
pub fn transform_point(point: &Point, op: &Operation, affinity: Affinity) -> Option<Point> {
    let mut out = point.clone();

    match op {
        Operation::InsertNode { .. } => {
            out.path = transform_path(&point.path, op, Affinity::Backward)?;
        }

        Operation::InsertText { path, offset, text } => {
            if *path == point.path
                && (*offset < point.offset || (*offset == point.offset && affinity == Affinity::Backward))
            {
                out.offset += utf16_len(text);
            }
        }

        Operation::RemoveText { path, offset, text } => {
            if *path == point.path && *offset <= point.offset {
                out.offset -= (point.offset - offset).min(utf16_len(text));
            }
        }

        Operation::MergeNode { path, position, .. } => {
            if *path == point.path {
                out.offset += position;
            }
            out.path = transform_path(&point.path, op, affinity)?;
        }

        Operation::SplitNode { path, position, .. } if *path == point.path => {
            if *position < point.offset || (*position == point.offset && affinity == Affinity::Backward) {
                out.offset -= position;
                out.path = transform_path(&point.path, op, Affinity::Backward)?;
            }
        }

        _ => {
            out.path = transform_path(&point.path, op, affinity)?;
        }
    }

    Some(out)
}

/// Rebase `range` through `op`. Returns `None` when either edge was removed.
pub fn transform_range(range: &Range, op: &Operation, affinity: RangeAffinity) -> Option<Range> {
    let (anchor_affinity, focus_affinity) = edge_affinities(range, affinity);
    let anchor = transform_point(&range.anchor, op, anchor_affinity)?;
    let focus = transform_point(&range.focus, op, focus_affinity)?;
    Some(Range::new(anchor, focus))
}
