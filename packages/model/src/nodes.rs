//! # Tree Traversal
//!
//! Lazy depth-first walk over a [`Document`], yielding `(NodeRef, Path)` pairs
//! in document order (or reverse document order).
//!
//! The walk starts at the root, descends toward `from`, and stops once it moves
//! past `to`. Ancestors of `from` are yielded on the way down; descendants of
//! `to` are included. A `pass` predicate prunes descent into a subtree without
//! hiding the subtree's root.

use crate::node::{Document, NodeRef};
use crate::path::Path;
use crate::point::Point;
use crate::range::Range;

/// Where a traversal or query applies
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Path(Path),
    Point(Point),
    Range(Range),
}

impl Location {
    /// First and last path the location touches, in document order
    pub fn span(&self) -> (Path, Path) {
        match self {
            Location::Path(path) => (path.clone(), path.clone()),
            Location::Point(point) => (point.path.clone(), point.path.clone()),
            Location::Range(range) => (range.start().path.clone(), range.end().path.clone()),
        }
    }
}

impl From<Path> for Location {
    fn from(path: Path) -> Self {
        Location::Path(path)
    }
}

impl From<Point> for Location {
    fn from(point: Point) -> Self {
        Location::Point(point)
    }
}

impl From<Range> for Location {
    fn from(range: Range) -> Self {
        Location::Range(range)
    }
}

/// Predicate deciding whether to skip a node's children
pub type PassFn<'a> = Box<dyn Fn(NodeRef<'_>, &Path) -> bool + 'a>;

/// Options for [`Document::nodes`]
pub struct NodesOptions<'a> {
    /// Restrict the walk to this location; the whole document when `None`
    pub at: Option<Location>,

    /// Walk in reverse document order
    pub reverse: bool,

    /// Return `true` to skip a node's children
    pub pass: Option<PassFn<'a>>,

    /// Descend into void elements
    pub voids: bool,
}

impl Default for NodesOptions<'_> {
    fn default() -> Self {
        Self {
            at: None,
            reverse: false,
            pass: None,
            voids: false,
        }
    }
}

impl<'a> NodesOptions<'a> {
    pub fn at(location: impl Into<Location>) -> Self {
        Self {
            at: Some(location.into()),
            ..Default::default()
        }
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn voids(mut self) -> Self {
        self.voids = true;
        self
    }

    pub fn pass(mut self, pass: impl Fn(NodeRef<'_>, &Path) -> bool + 'a) -> Self {
        self.pass = Some(Box::new(pass));
        self
    }
}

impl std::fmt::Debug for NodesOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodesOptions")
            .field("at", &self.at)
            .field("reverse", &self.reverse)
            .field("pass", &self.pass.as_ref().map(|_| "<fn>"))
            .field("voids", &self.voids)
            .finish()
    }
}

/// Iterator returned by [`Document::nodes`]
pub struct Nodes<'d, 'a> {
    document: &'d Document,
    from: Path,
    to: Option<Path>,
    reverse: bool,
    pass: Option<PassFn<'a>>,
    voids: bool,
    cursor: Option<Path>,
    /// The node under the cursor has already been yielded and its children walked
    ascended: bool,
}

impl Document {
    /// Walk the tree lazily
    pub fn nodes<'d, 'a>(&'d self, options: NodesOptions<'a>) -> Nodes<'d, 'a> {
        let (from, to) = match &options.at {
            Some(location) => {
                let (first, last) = location.span();
                if options.reverse {
                    (last, Some(first))
                } else {
                    (first, Some(last))
                }
            }
            None => (Path::root(), None),
        };

        Nodes {
            document: self,
            from,
            to,
            reverse: options.reverse,
            pass: options.pass,
            voids: options.voids,
            cursor: Some(Path::root()),
            ascended: false,
        }
    }
}

impl<'d> Nodes<'d, '_> {
    fn past_end(&self, path: &Path) -> bool {
        match &self.to {
            Some(to) if self.reverse => path.is_before(to),
            Some(to) => path.is_after(to),
            None => false,
        }
    }

    fn should_descend(&self, node: NodeRef<'d>, path: &Path) -> bool {
        if node.children().is_empty() {
            return false;
        }
        if !self.voids && node.is_void() {
            return false;
        }
        match &self.pass {
            Some(pass) => !pass(node, path),
            None => true,
        }
    }
}

impl<'d> Iterator for Nodes<'d, '_> {
    type Item = (NodeRef<'d>, Path);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = self.cursor.clone()?;
            if self.past_end(&path) {
                self.cursor = None;
                return None;
            }

            let Ok(node) = self.document.get(&path) else {
                self.cursor = None;
                return None;
            };
            let emit = !self.ascended;

            if !self.ascended && self.should_descend(node, &path) {
                let mut index = if self.reverse {
                    node.children().len() - 1
                } else {
                    0
                };
                if path.is_ancestor(&self.from) {
                    index = self.from[path.len()];
                }
                self.cursor = Some(path.child(index));
                self.ascended = false;
            } else if path.is_root() {
                self.cursor = None;
            } else if let Some(next) = path.next().filter(|next| !self.reverse && self.document.has(next)) {
                self.cursor = Some(next);
                self.ascended = false;
            } else if let Some(previous) = path.previous().filter(|_| self.reverse) {
                self.cursor = Some(previous);
                self.ascended = false;
            } else {
                self.cursor = path.parent();
                self.ascended = true;
            }

            if emit {
                return Some((node, path));
            }
        }
    }
}
