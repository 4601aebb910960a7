//! # Operations
//!
//! The nine primitive edits every document change is expressed in.
//!
//! ## Semantics
//!
//! - Every operation is validated against the tree before anything is touched,
//!   so a failed [`Operation::apply`] leaves the document exactly as it was.
//! - Every operation carries enough data to build its exact inverse without
//!   looking at the document again.
//! - Applying a tree operation also carries the document selection along with
//!   it (see [`crate::transform`]). `set_selection` is the only operation that
//!   replaces the selection outright.

use crate::error::{ModelResult, StructuralError};
use crate::node::{apply_patch, diff_attributes, Document, Element, Node, PropertyPatch, Text};
use crate::path::Path;
use crate::point::Point;
use crate::range::Range;
use crate::text::{byte_index, utf16_len};
use crate::transform::{edge_affinities, move_target, transform_path, transform_point, Affinity, RangeAffinity};
use serde::{Deserialize, Serialize};

/// Primitive, invertible document edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Insert `node` so that it ends up at `path`
    InsertNode { path: Path, node: Node },

    /// Remove the node at `path`; `node` is kept for the inverse
    RemoveNode { path: Path, node: Node },

    /// Detach the node at `path` and reattach it where `new_path` points
    MoveNode { path: Path, new_path: Path },

    /// Split the node at `path` at `position`. The trailing half becomes the
    /// next sibling, with `properties` patched over the original attributes.
    SplitNode {
        path: Path,
        position: usize,
        #[serde(default)]
        properties: PropertyPatch,
    },

    /// Merge the node at `path` into its previous sibling, whose size was
    /// `position`. `properties` turns the sibling's attributes into the merged
    /// node's, and is what the inverse split restores.
    MergeNode {
        path: Path,
        position: usize,
        #[serde(default)]
        properties: PropertyPatch,
    },

    /// Patch the attributes of the node at `path`
    SetNode {
        path: Path,
        properties: PropertyPatch,
        new_properties: PropertyPatch,
    },

    InsertText { path: Path, offset: usize, text: String },

    RemoveText { path: Path, offset: usize, text: String },

    /// Replace (or clear, when `new_properties` is `None`) the selection
    SetSelection {
        properties: Option<SelectionPatch>,
        new_properties: Option<SelectionPatch>,
    },
}

/// Partial selection update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Point>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<Point>,
}

impl From<&Range> for SelectionPatch {
    fn from(range: &Range) -> Self {
        Self {
            anchor: Some(range.anchor.clone()),
            focus: Some(range.focus.clone()),
        }
    }
}

impl Operation {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Operation::InsertNode { .. } => "insert_node",
            Operation::RemoveNode { .. } => "remove_node",
            Operation::MoveNode { .. } => "move_node",
            Operation::SplitNode { .. } => "split_node",
            Operation::MergeNode { .. } => "merge_node",
            Operation::SetNode { .. } => "set_node",
            Operation::InsertText { .. } => "insert_text",
            Operation::RemoveText { .. } => "remove_text",
            Operation::SetSelection { .. } => "set_selection",
        }
    }

    /// Path the operation targets; `None` for selection changes
    pub fn path(&self) -> Option<&Path> {
        match self {
            Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path, .. }
            | Operation::MoveNode { path, .. }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::SetNode { path, .. }
            | Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. } => Some(path),
            Operation::SetSelection { .. } => None,
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, Operation::SetSelection { .. })
    }

    /// Whether the operation can change the shape of the tree
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Operation::InsertNode { .. }
                | Operation::RemoveNode { .. }
                | Operation::MoveNode { .. }
                | Operation::SplitNode { .. }
                | Operation::MergeNode { .. }
        )
    }

    /// Remove the node currently at `path`
    pub fn remove_at(doc: &Document, path: &Path) -> ModelResult<Self> {
        Ok(Operation::RemoveNode {
            path: path.clone(),
            node: doc.node(path)?.clone(),
        })
    }

    /// Split at `position`, the trailing half keeping the same attributes
    pub fn split_at(path: &Path, position: usize) -> Self {
        Operation::SplitNode {
            path: path.clone(),
            position,
            properties: PropertyPatch::new(),
        }
    }

    /// Merge the node at `path` into its previous sibling
    pub fn merge_at(doc: &Document, path: &Path) -> ModelResult<Self> {
        let previous = path
            .previous()
            .ok_or_else(|| StructuralError::NoPreviousSibling(path.clone()))?;
        let prev = doc.node(&previous)?;
        let node = doc.node(path)?;
        Ok(Operation::MergeNode {
            path: path.clone(),
            position: prev.size(),
            properties: diff_attributes(prev.attributes(), node.attributes()),
        })
    }

    /// Patch attributes, recording the prior values for the inverse
    pub fn set_at(doc: &Document, path: &Path, patch: PropertyPatch) -> ModelResult<Self> {
        let attributes = doc.node(path)?.attributes();
        let properties = patch
            .keys()
            .map(|key| (key.clone(), attributes.get(key).cloned()))
            .collect();
        Ok(Operation::SetNode {
            path: path.clone(),
            properties,
            new_properties: patch,
        })
    }

    /// Remove `len` UTF-16 units starting at `offset`
    pub fn remove_text_at(doc: &Document, path: &Path, offset: usize, len: usize) -> ModelResult<Self> {
        let leaf = doc.leaf(path)?;
        let start = byte_index(&leaf.text, offset)
            .ok_or_else(|| StructuralError::invalid_offset(path, offset))?;
        let end = byte_index(&leaf.text, offset + len)
            .ok_or_else(|| StructuralError::invalid_offset(path, offset + len))?;
        Ok(Operation::RemoveText {
            path: path.clone(),
            offset,
            text: leaf.text[start..end].to_string(),
        })
    }

    /// Select `range`
    pub fn select(doc: &Document, range: &Range) -> Self {
        Operation::SetSelection {
            properties: doc.selection.as_ref().map(SelectionPatch::from),
            new_properties: Some(SelectionPatch::from(range)),
        }
    }

    /// Clear the selection
    pub fn deselect(doc: &Document) -> Self {
        Operation::SetSelection {
            properties: doc.selection.as_ref().map(SelectionPatch::from),
            new_properties: None,
        }
    }

    /// Apply to `doc`. Validation runs first; on error nothing changes.
    pub fn apply(&self, doc: &mut Document) -> ModelResult<()> {
        self.validate(doc)?;

        match self {
            Operation::InsertNode { path, node } => Self::apply_insert(doc, path, node.clone())?,
            Operation::RemoveNode { path, .. } => {
                Self::apply_remove(doc, path)?;
            }
            Operation::MoveNode { path, new_path } => Self::apply_move(doc, path, new_path)?,
            Operation::SplitNode {
                path,
                position,
                properties,
            } => Self::apply_split(doc, path, *position, properties)?,
            Operation::MergeNode { path, .. } => Self::apply_merge(doc, path)?,
            Operation::SetNode {
                path, new_properties, ..
            } => apply_patch(doc.node_mut(path)?.attributes_mut(), new_properties),
            Operation::InsertText { path, offset, text } => {
                let leaf = Self::leaf_mut(doc, path)?;
                let at = byte_index(&leaf.text, *offset)
                    .ok_or_else(|| StructuralError::invalid_offset(path, *offset))?;
                leaf.text.insert_str(at, text);
            }
            Operation::RemoveText { path, offset, text } => {
                let leaf = Self::leaf_mut(doc, path)?;
                let start = byte_index(&leaf.text, *offset)
                    .ok_or_else(|| StructuralError::invalid_offset(path, *offset))?;
                leaf.text.replace_range(start..start + text.len(), "");
            }
            Operation::SetSelection { new_properties, .. } => {
                doc.selection = Self::selection_after(doc, new_properties.as_ref())?;
                return Ok(());
            }
        }

        self.carry_selection(doc);
        Ok(())
    }

    /// Check the operation against `doc` without applying it
    pub fn validate(&self, doc: &Document) -> ModelResult<()> {
        if let Some(path) = self.path() {
            Self::check_outside_void(doc, path)?;
        }
        match self {
            Operation::InsertNode { path, node } => {
                let index = path.last().ok_or(StructuralError::RootOperation("insert a node as"))?;
                Self::check_destination(doc, path, node, index, 0)
            }

            Operation::RemoveNode { path, .. } => {
                if path.is_root() {
                    return Err(StructuralError::RootOperation("remove"));
                }
                doc.node(path).map(|_| ())
            }

            Operation::MoveNode { path, new_path } => {
                if path == new_path {
                    return Ok(());
                }
                if path.is_root() || new_path.is_root() {
                    return Err(StructuralError::RootOperation("move"));
                }
                let node = doc.node(path)?;
                Self::check_outside_void(doc, new_path)?;
                if path.is_ancestor(new_path) {
                    return Err(StructuralError::MoveIntoSelf {
                        path: path.clone(),
                        new_path: new_path.clone(),
                    });
                }
                // `new_path`'s parent names the same node before and after the
                // removal, only its child count may drop by one.
                let target = move_target(path, new_path);
                let index = target.last().unwrap_or_default();
                let removed = usize::from(path.parent() == new_path.parent());
                Self::check_destination(doc, new_path, node, index, removed)
            }

            Operation::SplitNode { path, position, .. } => {
                if path.is_root() {
                    return Err(StructuralError::RootOperation("split"));
                }
                match doc.node(path)? {
                    Node::Text(text) => {
                        if byte_index(&text.text, *position).is_none() {
                            return Err(StructuralError::invalid_position(path, *position));
                        }
                    }
                    Node::Element(element) => {
                        if element.is_void {
                            return Err(StructuralError::VoidSplit(path.clone()));
                        }
                        if *position > element.children.len() {
                            return Err(StructuralError::invalid_position(path, *position));
                        }
                    }
                }
                Ok(())
            }

            Operation::MergeNode { path, position, .. } => {
                if path.is_root() {
                    return Err(StructuralError::RootOperation("merge"));
                }
                let node = doc.node(path)?;
                let previous = path
                    .previous()
                    .ok_or_else(|| StructuralError::NoPreviousSibling(path.clone()))?;
                let prev = doc.node(&previous)?;
                if prev.is_void() {
                    return Err(StructuralError::VoidDescendant(previous.child(prev.size())));
                }
                if node.is_text() != prev.is_text() {
                    return Err(StructuralError::MergeMismatch(path.clone()));
                }
                if prev.size() != *position {
                    return Err(StructuralError::invalid_position(path, *position));
                }
                Ok(())
            }

            Operation::SetNode { path, .. } => {
                if path.is_root() {
                    return Err(StructuralError::RootOperation("set properties on"));
                }
                doc.node(path).map(|_| ())
            }

            Operation::InsertText { path, offset, .. } => {
                let leaf = doc.leaf(path)?;
                byte_index(&leaf.text, *offset)
                    .map(|_| ())
                    .ok_or_else(|| StructuralError::invalid_offset(path, *offset))
            }

            Operation::RemoveText { path, offset, text } => {
                let leaf = doc.leaf(path)?;
                let end_offset = offset + utf16_len(text);
                let start = byte_index(&leaf.text, *offset)
                    .ok_or_else(|| StructuralError::invalid_offset(path, *offset))?;
                let end = byte_index(&leaf.text, end_offset)
                    .ok_or_else(|| StructuralError::invalid_offset(path, end_offset))?;
                let found = &leaf.text[start..end];
                if found != text {
                    return Err(StructuralError::TextMismatch {
                        path: path.clone(),
                        expected: text.clone(),
                        found: found.to_string(),
                    });
                }
                Ok(())
            }

            Operation::SetSelection { new_properties, .. } => {
                Self::selection_after(doc, new_properties.as_ref()).map(|_| ())
            }
        }
    }

    /// Only a void element itself may be targeted, never its placeholder
    /// content
    fn check_outside_void(doc: &Document, path: &Path) -> ModelResult<()> {
        match doc.void_ancestor(path) {
            Some(_) => Err(StructuralError::VoidDescendant(path.clone())),
            None => Ok(()),
        }
    }

    /// The operation that undoes this one
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::InsertNode { path, node } => Operation::RemoveNode {
                path: path.clone(),
                node: node.clone(),
            },

            Operation::RemoveNode { path, node } => Operation::InsertNode {
                path: path.clone(),
                node: node.clone(),
            },

            Operation::MoveNode { path, new_path } => {
                if path == new_path {
                    return self.clone();
                }
                if path.is_sibling(new_path) {
                    return Operation::MoveNode {
                        path: new_path.clone(),
                        new_path: path.clone(),
                    };
                }
                // The node now sits at its transformed path and must return to
                // wherever its old next sibling went.
                let next = path.next().unwrap_or_else(|| path.clone());
                Operation::MoveNode {
                    path: transform_path(path, self, Affinity::Forward).unwrap_or_else(|| path.clone()),
                    new_path: transform_path(&next, self, Affinity::Forward).unwrap_or(next),
                }
            }

            Operation::SplitNode {
                path,
                position,
                properties,
            } => Operation::MergeNode {
                path: path.next().unwrap_or_else(|| path.clone()),
                position: *position,
                properties: properties.clone(),
            },

            Operation::MergeNode {
                path,
                position,
                properties,
            } => Operation::SplitNode {
                path: path.previous().unwrap_or_else(|| path.clone()),
                position: *position,
                properties: properties.clone(),
            },

            Operation::SetNode {
                path,
                properties,
                new_properties,
            } => Operation::SetNode {
                path: path.clone(),
                properties: new_properties.clone(),
                new_properties: properties.clone(),
            },

            Operation::InsertText { path, offset, text } => Operation::RemoveText {
                path: path.clone(),
                offset: *offset,
                text: text.clone(),
            },

            Operation::RemoveText { path, offset, text } => Operation::InsertText {
                path: path.clone(),
                offset: *offset,
                text: text.clone(),
            },

            Operation::SetSelection {
                properties,
                new_properties,
            } => Operation::SetSelection {
                properties: new_properties.clone(),
                new_properties: properties.clone(),
            },
        }
    }

    /// `node` may land at `index` under `path`'s parent, whose child count
    /// will have dropped by `removed` by then
    fn check_destination(doc: &Document, path: &Path, node: &Node, index: usize, removed: usize) -> ModelResult<()> {
        let parent_path = path.parent().unwrap_or_default();
        let parent = doc.get(&parent_path)?;
        if parent.is_text() {
            return Err(StructuralError::NotElement(parent_path));
        }
        if parent.is_root() && node.is_text() {
            return Err(StructuralError::InvalidRootChild(path.clone()));
        }
        let len = parent.children().len() - removed;
        if index > len {
            return Err(StructuralError::invalid_position(&parent_path, index));
        }
        Ok(())
    }

    fn leaf_mut<'d>(doc: &'d mut Document, path: &Path) -> ModelResult<&'d mut Text> {
        match doc.node_mut(path)? {
            Node::Text(text) => Ok(text),
            Node::Element(_) => Err(StructuralError::NotText(path.clone())),
        }
    }

    fn split_parent(path: &Path) -> ModelResult<(Path, usize)> {
        match (path.parent(), path.last()) {
            (Some(parent), Some(index)) => Ok((parent, index)),
            _ => Err(StructuralError::RootOperation("address")),
        }
    }

    fn apply_insert(doc: &mut Document, path: &Path, node: Node) -> ModelResult<()> {
        let (parent, index) = Self::split_parent(path)?;
        doc.children_mut(&parent)?.insert(index, node);
        Ok(())
    }

    fn apply_remove(doc: &mut Document, path: &Path) -> ModelResult<Node> {
        let (parent, index) = Self::split_parent(path)?;
        let children = doc.children_mut(&parent)?;
        if index >= children.len() {
            return Err(StructuralError::NodeNotFound(path.clone()));
        }
        Ok(children.remove(index))
    }

    fn apply_move(doc: &mut Document, path: &Path, new_path: &Path) -> ModelResult<()> {
        if path == new_path {
            return Ok(());
        }
        let node = Self::apply_remove(doc, path)?;
        Self::apply_insert(doc, &move_target(path, new_path), node)
    }

    fn apply_split(doc: &mut Document, path: &Path, position: usize, properties: &PropertyPatch) -> ModelResult<()> {
        let (parent, index) = Self::split_parent(path)?;
        let children = doc.children_mut(&parent)?;
        let node = children
            .get_mut(index)
            .ok_or_else(|| StructuralError::NodeNotFound(path.clone()))?;

        let trailing = match node {
            Node::Text(text) => {
                let at = byte_index(&text.text, position)
                    .ok_or_else(|| StructuralError::invalid_position(path, position))?;
                let mut attributes = text.attributes.clone();
                apply_patch(&mut attributes, properties);
                Node::Text(Text {
                    text: text.text.split_off(at),
                    attributes,
                })
            }
            Node::Element(element) => {
                if position > element.children.len() {
                    return Err(StructuralError::invalid_position(path, position));
                }
                let mut attributes = element.attributes.clone();
                apply_patch(&mut attributes, properties);
                Node::Element(Element {
                    attributes,
                    is_inline: element.is_inline,
                    is_void: element.is_void,
                    children: element.children.split_off(position),
                })
            }
        };

        children.insert(index + 1, trailing);
        Ok(())
    }

    fn apply_merge(doc: &mut Document, path: &Path) -> ModelResult<()> {
        let (parent, index) = Self::split_parent(path)?;
        if index == 0 {
            return Err(StructuralError::NoPreviousSibling(path.clone()));
        }
        let children = doc.children_mut(&parent)?;
        if index >= children.len() {
            return Err(StructuralError::NodeNotFound(path.clone()));
        }
        let node = children.remove(index);
        match (&mut children[index - 1], node) {
            (Node::Text(prev), Node::Text(text)) => prev.text.push_str(&text.text),
            (Node::Element(prev), Node::Element(element)) => prev.children.extend(element.children),
            (_, node) => {
                children.insert(index, node);
                return Err(StructuralError::MergeMismatch(path.clone()));
            }
        }
        Ok(())
    }

    fn selection_after(doc: &Document, patch: Option<&SelectionPatch>) -> ModelResult<Option<Range>> {
        let Some(patch) = patch else {
            return Ok(None);
        };
        let range = match (&doc.selection, &patch.anchor, &patch.focus) {
            (Some(current), anchor, focus) => Range::new(
                anchor.clone().unwrap_or_else(|| current.anchor.clone()),
                focus.clone().unwrap_or_else(|| current.focus.clone()),
            ),
            (None, Some(anchor), Some(focus)) => Range::new(anchor.clone(), focus.clone()),
            (None, _, _) => {
                return Err(StructuralError::invalid_selection(
                    "a new selection needs both an anchor and a focus",
                ))
            }
        };
        doc.validate_point(&range.anchor)?;
        doc.validate_point(&range.focus)?;
        Ok(Some(range))
    }

    /// Move the selection along with a tree edit that has just been applied
    fn carry_selection(&self, doc: &mut Document) {
        let Some(selection) = doc.selection.take() else {
            return;
        };
        let (anchor_affinity, focus_affinity) = edge_affinities(&selection, RangeAffinity::Inward);
        let anchor = self.carry_point(doc, &selection.anchor, anchor_affinity);
        let focus = self.carry_point(doc, &selection.focus, focus_affinity);
        doc.selection = match (anchor, focus) {
            (Some(anchor), Some(focus)) => Some(Range::new(anchor, focus)),
            _ => None,
        };
    }

    fn carry_point(&self, doc: &Document, point: &Point, affinity: Affinity) -> Option<Point> {
        if let Some(point) = transform_point(point, self, affinity) {
            return Some(point);
        }
        match self {
            Operation::RemoveNode { path, .. } => nearest_text(doc, path),
            _ => None,
        }
    }
}

/// Closest text position to a node that was just removed from `removed`
fn nearest_text(doc: &Document, removed: &Path) -> Option<Point> {
    let texts = doc.texts(&Path::root()).ok()?;
    let mut prev = None;
    let mut next = None;
    for (text, path) in texts {
        if path.is_before(removed) {
            prev = Some((text, path));
        } else {
            next = Some((text, path));
            break;
        }
    }

    let prefer_next = match (&prev, &next) {
        (Some(_), Some((_, next_path))) if next_path == removed => !next_path.has_previous(),
        (Some((_, prev_path)), Some((_, next_path))) => {
            prev_path.common(removed).len() < next_path.common(removed).len()
        }
        _ => false,
    };

    match (prev, next) {
        (Some((text, path)), _) if !prefer_next => Some(Point::new(path, text.utf16_len())),
        (_, Some((_, path))) => Some(Point::new(path, 0)),
        _ => None,
    }
}
