//! # Node Tree
//!
//! The document is a tree of three node kinds:
//!
//! - [`Document`]: the root. Owns the top-level blocks and the selection.
//! - [`Element`]: a block or inline container with an attribute map.
//! - [`Text`]: a leaf holding a string and character-level formatting.
//!
//! [`NodeRef`] is the borrowed, closed view over all three that queries
//! return, so callers can pattern match on the root too.

use crate::error::{ModelResult, StructuralError};
use crate::path::Path;
use crate::point::Point;
use crate::range::Range;
use crate::text::utf16_len;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute map carried by elements and text leaves
pub type Attributes = BTreeMap<String, Value>;

/// Shallow attribute patch: `Some` sets a key, `None` removes it
pub type PropertyPatch = BTreeMap<String, Option<Value>>;

/// Attribute naming an element's kind ("paragraph", "quote", ...)
pub const TYPE_KEY: &str = "type";

fn is_false(value: &bool) -> bool {
    !*value
}

/// Document root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Range>,
}

/// Element or text node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    Text(Text),
}

/// Container node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_inline: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_void: bool,

    #[serde(default)]
    pub children: Vec<Node>,
}

/// Leaf node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
}

/// Borrowed view over any node, including the root
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Root(&'a Document),
    Element(&'a Element),
    Text(&'a Text),
}

/// A node together with its path
pub type NodeEntry<'a> = (NodeRef<'a>, Path);

/// Apply a shallow patch to an attribute map
pub fn apply_patch(attributes: &mut Attributes, patch: &PropertyPatch) {
    for (key, value) in patch {
        match value {
            Some(value) => {
                attributes.insert(key.clone(), value.clone());
            }
            None => {
                attributes.remove(key);
            }
        }
    }
}

/// The patch that turns `from` into `to`
pub fn diff_attributes(from: &Attributes, to: &Attributes) -> PropertyPatch {
    let mut patch = PropertyPatch::new();
    for key in from.keys() {
        if !to.contains_key(key) {
            patch.insert(key.clone(), None);
        }
    }
    for (key, value) in to {
        if from.get(key) != Some(value) {
            patch.insert(key.clone(), Some(value.clone()));
        }
    }
    patch
}

impl Element {
    /// Block element with the given `type` attribute
    pub fn new(kind: impl Into<String>) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(TYPE_KEY.to_string(), Value::String(kind.into()));
        Self {
            attributes,
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }

    pub fn void(mut self) -> Self {
        self.is_void = true;
        self
    }

    /// Value of the `type` attribute
    pub fn kind(&self) -> Option<&str> {
        self.attributes.get(TYPE_KEY).and_then(Value::as_str)
    }
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a boolean formatting mark such as `bold`
    pub fn mark(self, key: impl Into<String>) -> Self {
        self.with_attribute(key, true)
    }

    pub fn utf16_len(&self) -> usize {
        utf16_len(&self.text)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    /// Block element of `kind` holding `children`
    pub fn element(kind: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(Element::new(kind).with_children(children))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => &element.attributes,
            Node::Text(text) => &text.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Element(element) => &mut element.attributes,
            Node::Text(text) => &mut text.attributes,
        }
    }

    /// Children of an element; text leaves have none
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            Node::Text(_) => &[],
        }
    }

    /// Inline content: text leaves and inline elements
    pub fn is_inline(&self) -> bool {
        match self {
            Node::Element(element) => element.is_inline,
            Node::Text(_) => true,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Node::Element(element) if element.is_void)
    }

    /// Concatenated text of every leaf below this node
    pub fn string(&self) -> String {
        let mut out = String::new();
        collect_string(self, &mut out);
        out
    }

    /// Size used by split/merge positions: UTF-16 length for text, child count
    /// for elements
    pub fn size(&self) -> usize {
        match self {
            Node::Element(element) => element.children.len(),
            Node::Text(text) => text.utf16_len(),
        }
    }
}

fn collect_string(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&text.text),
        Node::Element(element) => {
            for child in &element.children {
                collect_string(child, out);
            }
        }
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(node: &'a Node) -> Self {
        match node {
            Node::Element(element) => NodeRef::Element(element),
            Node::Text(text) => NodeRef::Text(text),
        }
    }
}

impl<'a> NodeRef<'a> {
    pub fn children(&self) -> &'a [Node] {
        match *self {
            NodeRef::Root(document) => &document.children,
            NodeRef::Element(element) => &element.children,
            NodeRef::Text(_) => &[],
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, NodeRef::Root(_))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, NodeRef::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeRef::Text(_))
    }

    pub fn as_element(&self) -> Option<&'a Element> {
        match *self {
            NodeRef::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&'a Text> {
        match *self {
            NodeRef::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Attributes of an element or leaf; the root has none
    pub fn attributes(&self) -> Option<&'a Attributes> {
        match *self {
            NodeRef::Root(_) => None,
            NodeRef::Element(element) => Some(&element.attributes),
            NodeRef::Text(text) => Some(&text.attributes),
        }
    }

    pub fn is_inline(&self) -> bool {
        match *self {
            NodeRef::Root(_) => false,
            NodeRef::Element(element) => element.is_inline,
            NodeRef::Text(_) => true,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, NodeRef::Element(element) if element.is_void)
    }

    pub fn kind(&self) -> Option<&'a str> {
        self.as_element().and_then(Element::kind)
    }

    pub fn string(&self) -> String {
        let mut out = String::new();
        match *self {
            NodeRef::Text(text) => out.push_str(&text.text),
            _ => {
                for child in self.children() {
                    collect_string(child, &mut out);
                }
            }
        }
        out
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            selection: None,
        }
    }

    /// Node at `path`
    pub fn get(&self, path: &Path) -> ModelResult<NodeRef<'_>> {
        if path.is_root() {
            return Ok(NodeRef::Root(self));
        }
        self.node(path).map(NodeRef::from)
    }

    pub fn has(&self, path: &Path) -> bool {
        self.get(path).is_ok()
    }

    /// Non-root node at `path`
    pub fn node(&self, path: &Path) -> ModelResult<&Node> {
        let (first, rest) = path
            .split_first()
            .ok_or(StructuralError::RootOperation("address"))?;
        let mut node = self
            .children
            .get(*first)
            .ok_or_else(|| StructuralError::NodeNotFound(path.clone()))?;
        for index in rest {
            node = node
                .children()
                .get(*index)
                .ok_or_else(|| StructuralError::NodeNotFound(path.clone()))?;
        }
        Ok(node)
    }

    pub(crate) fn node_mut(&mut self, path: &Path) -> ModelResult<&mut Node> {
        let (last, parent) = path
            .split_last()
            .ok_or(StructuralError::RootOperation("address"))?;
        self.children_mut(&Path::from(parent))?
            .get_mut(*last)
            .ok_or_else(|| StructuralError::NodeNotFound(path.clone()))
    }

    /// Child list of the root or element at `path`
    pub(crate) fn children_mut(&mut self, path: &Path) -> ModelResult<&mut Vec<Node>> {
        let mut children = &mut self.children;
        for (depth, index) in path.iter().enumerate() {
            let node = children
                .get_mut(*index)
                .ok_or_else(|| StructuralError::NodeNotFound(path.clone()))?;
            children = match node {
                Node::Element(element) => &mut element.children,
                Node::Text(_) => {
                    return Err(StructuralError::NotElement(Path::from(&path[..=depth])))
                }
            };
        }
        Ok(children)
    }

    /// Parent of the node at `path`
    pub fn parent(&self, path: &Path) -> ModelResult<NodeRef<'_>> {
        let parent = path.parent().ok_or(StructuralError::RootOperation("find the parent of"))?;
        self.get(&parent)
    }

    /// Child `index` of the node at `path`
    pub fn child(&self, path: &Path, index: usize) -> ModelResult<NodeEntry<'_>> {
        let child = path.child(index);
        Ok((self.get(&child)?, child))
    }

    /// Text leaf at `path`
    pub fn leaf(&self, path: &Path) -> ModelResult<&Text> {
        match self.node(path)? {
            Node::Text(text) => Ok(text),
            Node::Element(_) => Err(StructuralError::NotText(path.clone())),
        }
    }

    /// Deepest first descendant of the node at `path`
    pub fn first(&self, path: &Path) -> ModelResult<NodeEntry<'_>> {
        self.edge_descendant(path, false)
    }

    /// Deepest last descendant of the node at `path`
    pub fn last(&self, path: &Path) -> ModelResult<NodeEntry<'_>> {
        self.edge_descendant(path, true)
    }

    fn edge_descendant(&self, path: &Path, last: bool) -> ModelResult<NodeEntry<'_>> {
        let mut node = self.get(path)?;
        let mut current = path.clone();
        loop {
            let children = node.children();
            if children.is_empty() {
                return Ok((node, current));
            }
            let index = if last { children.len() - 1 } else { 0 };
            node = NodeRef::from(&children[index]);
            current = current.child(index);
        }
    }

    /// Text content under `path`
    pub fn string(&self, path: &Path) -> ModelResult<String> {
        Ok(self.get(path)?.string())
    }

    /// Every text leaf under `path` in document order
    pub fn texts(&self, path: &Path) -> ModelResult<Vec<(&Text, Path)>> {
        let node = self.get(path)?;
        let mut out = Vec::new();
        collect_texts(node.children(), path, &mut out);
        if let NodeRef::Text(text) = node {
            out.push((text, path.clone()));
        }
        Ok(out)
    }

    /// Every element under `path` in document order
    pub fn elements(&self, path: &Path) -> ModelResult<Vec<(&Element, Path)>> {
        let node = self.get(path)?;
        let mut out = Vec::new();
        collect_elements(node.children(), path, &mut out);
        Ok(out)
    }

    /// Every level from the root down to `path`, root first
    pub fn levels(&self, path: &Path) -> ModelResult<Vec<NodeEntry<'_>>> {
        path.levels()
            .into_iter()
            .map(|level| Ok((self.get(&level)?, level)))
            .collect()
    }

    /// Ancestors of `path`, root first
    pub fn ancestors(&self, path: &Path) -> ModelResult<Vec<NodeEntry<'_>>> {
        let mut levels = self.levels(path)?;
        levels.pop();
        Ok(levels)
    }

    /// Closest void element strictly above `path`, if any.
    ///
    /// Everything under a void is a placeholder and cannot be edited on its
    /// own.
    pub fn void_ancestor(&self, path: &Path) -> Option<Path> {
        let (_, above) = path.split_last()?;
        let mut children = &self.children;
        for (depth, index) in above.iter().enumerate() {
            let node = children.get(*index)?;
            if node.is_void() {
                return Some(Path::from(&above[..=depth]));
            }
            children = match node {
                Node::Element(element) => &element.children,
                Node::Text(_) => return None,
            };
        }
        None
    }

    /// Deepest node that contains both paths
    pub fn common(&self, a: &Path, b: &Path) -> ModelResult<NodeEntry<'_>> {
        let common = a.common(b);
        Ok((self.get(&common)?, common))
    }

    pub fn next_sibling(&self, path: &Path) -> Option<NodeEntry<'_>> {
        let next = path.next()?;
        let node = self.get(&next).ok()?;
        Some((node, next))
    }

    pub fn previous_sibling(&self, path: &Path) -> Option<NodeEntry<'_>> {
        let previous = path.previous()?;
        let node = self.get(&previous).ok()?;
        Some((node, previous))
    }

    /// First position inside the node at `path`
    pub fn start(&self, path: &Path) -> ModelResult<Point> {
        let (node, leaf_path) = self.first(path)?;
        match node {
            NodeRef::Text(_) => Ok(Point::new(leaf_path, 0)),
            _ => Err(StructuralError::NotText(leaf_path)),
        }
    }

    /// Last position inside the node at `path`
    pub fn end(&self, path: &Path) -> ModelResult<Point> {
        let (node, leaf_path) = self.last(path)?;
        match node {
            NodeRef::Text(text) => Ok(Point::new(leaf_path, text.utf16_len())),
            _ => Err(StructuralError::NotText(leaf_path)),
        }
    }

    /// Range spanning the whole node at `path`
    pub fn range(&self, path: &Path) -> ModelResult<Range> {
        Ok(Range::new(self.start(path)?, self.end(path)?))
    }

    /// Check that a point addresses a real position
    pub fn validate_point(&self, point: &Point) -> ModelResult<()> {
        let leaf = self.leaf(&point.path)?;
        if crate::text::byte_index(&leaf.text, point.offset).is_none() {
            return Err(StructuralError::invalid_offset(&point.path, point.offset));
        }
        Ok(())
    }
}

fn collect_texts<'a>(children: &'a [Node], parent: &Path, out: &mut Vec<(&'a Text, Path)>) {
    for (index, child) in children.iter().enumerate() {
        let path = parent.child(index);
        match child {
            Node::Text(text) => out.push((text, path)),
            Node::Element(element) => collect_texts(&element.children, &path, out),
        }
    }
}

fn collect_elements<'a>(children: &'a [Node], parent: &Path, out: &mut Vec<(&'a Element, Path)>) {
    for (index, child) in children.iter().enumerate() {
        if let Node::Element(element) = child {
            let path = parent.child(index);
            out.push((element, path.clone()));
            collect_elements(&element.children, &path, out);
        }
    }
}
