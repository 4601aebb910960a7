//! # Paths
//!
//! A [`Path`] addresses a node by the child indices taken while descending from
//! the document root. The empty path is the root itself.
//!
//! Paths are snapshot addresses: they stop meaning anything the moment the tree
//! changes shape, which is what [`crate::transform`] is for.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// List of child indices from the root down to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The root path (empty)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.0
    }

    /// Index of the node within its parent, `None` for the root
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the parent node, `None` for the root
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Path of the child at `index`
    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Append a relative path
    pub fn join(&self, relative: &[usize]) -> Path {
        let mut indices = self.0.clone();
        indices.extend_from_slice(relative);
        Self(indices)
    }

    /// Path of the next sibling, `None` for the root
    pub fn next(&self) -> Option<Path> {
        let last = self.last()?;
        let mut indices = self.0.clone();
        *indices.last_mut()? = last + 1;
        Some(Self(indices))
    }

    /// Path of the previous sibling, `None` for the root or a first child
    pub fn previous(&self) -> Option<Path> {
        let last = self.last()?;
        if last == 0 {
            return None;
        }
        let mut indices = self.0.clone();
        *indices.last_mut()? = last - 1;
        Some(Self(indices))
    }

    pub fn has_previous(&self) -> bool {
        matches!(self.last(), Some(last) if last > 0)
    }

    /// Every ancestor path, root first, excluding the path itself
    pub fn ancestors(&self) -> Vec<Path> {
        (0..self.0.len()).map(|len| Self(self.0[..len].to_vec())).collect()
    }

    /// Every ancestor path plus the path itself, root first
    pub fn levels(&self) -> Vec<Path> {
        (0..=self.0.len()).map(|len| Self(self.0[..len].to_vec())).collect()
    }

    /// Longest shared prefix of two paths
    pub fn common(&self, other: &Path) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Self(self.0[..shared].to_vec())
    }

    /// Compare document position.
    ///
    /// Only the shared prefix length is compared, so an ancestor is `Equal` to
    /// its descendants. Use [`Ord`] for a strict total order.
    pub fn compare(&self, other: &Path) -> Ordering {
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    pub fn is_before(&self, other: &Path) -> bool {
        self.compare(other) == Ordering::Less
    }

    pub fn is_after(&self, other: &Path) -> bool {
        self.compare(other) == Ordering::Greater
    }

    pub fn is_ancestor(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && self.compare(other) == Ordering::Equal
    }

    pub fn is_descendant(&self, other: &Path) -> bool {
        other.is_ancestor(self)
    }

    pub fn is_parent(&self, other: &Path) -> bool {
        self.0.len() + 1 == other.0.len() && self.compare(other) == Ordering::Equal
    }

    pub fn is_child(&self, other: &Path) -> bool {
        other.is_parent(self)
    }

    /// True when `self` is `other` or one of its ancestors
    pub fn is_common(&self, other: &Path) -> bool {
        self.0.len() <= other.0.len() && self.compare(other) == Ordering::Equal
    }

    /// Same parent, different index
    pub fn is_sibling(&self, other: &Path) -> bool {
        if self.0.is_empty() || self.0.len() != other.0.len() {
            return false;
        }
        let depth = self.0.len() - 1;
        self.0[..depth] == other.0[..depth] && self.0[depth] != other.0[depth]
    }

    /// True when `self` is an earlier sibling of `other` or of one of its ancestors
    pub fn ends_before(&self, other: &Path) -> bool {
        self.ends_cmp(other) == Some(Ordering::Less)
    }

    /// True when `self` is a later sibling of `other` or of one of its ancestors
    pub fn ends_after(&self, other: &Path) -> bool {
        self.ends_cmp(other) == Some(Ordering::Greater)
    }

    /// True when `self` is `other` or an ancestor of it, compared at `self`'s depth
    pub fn ends_at(&self, other: &Path) -> bool {
        self.ends_cmp(other) == Some(Ordering::Equal)
    }

    fn ends_cmp(&self, other: &Path) -> Option<Ordering> {
        let depth = self.0.len().checked_sub(1)?;
        if other.0.len() <= depth || self.0[..depth] != other.0[..depth] {
            return None;
        }
        Some(self.0[depth].cmp(&other.0[depth]))
    }

    /// Strip `ancestor` off the front of this path
    pub fn relative(&self, ancestor: &Path) -> Option<Path> {
        if !ancestor.is_common(self) {
            return None;
        }
        Some(Self(self.0[ancestor.0.len()..].to_vec()))
    }
}

impl Deref for Path {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl From<&[usize]> for Path {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "]")
    }
}
