//! Selections and spans

use crate::path::Path;
use crate::point::Point;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An `(anchor, focus)` pair of points.
///
/// The anchor may come after the focus; such a range is "backward" and records
/// that the user dragged right-to-left.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

/// Something a range can be tested against with [`Range::includes`]
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Path(&'a Path),
    Point(&'a Point),
    Range(&'a Range),
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// A caret at `point`
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.is_after(&self.focus)
    }

    pub fn is_forward(&self) -> bool {
        !self.is_backward()
    }

    /// `(start, end)` in document order, or `(end, start)` when `reverse`
    pub fn edges(&self, reverse: bool) -> (&Point, &Point) {
        let (start, end) = if self.is_backward() {
            (&self.focus, &self.anchor)
        } else {
            (&self.anchor, &self.focus)
        };
        if reverse {
            (end, start)
        } else {
            (start, end)
        }
    }

    pub fn start(&self) -> &Point {
        self.edges(false).0
    }

    pub fn end(&self) -> &Point {
        self.edges(false).1
    }

    /// The anchor and focus, in that order
    pub fn points(&self) -> [&Point; 2] {
        [&self.anchor, &self.focus]
    }

    pub fn includes(&self, target: Target<'_>) -> bool {
        let (start, end) = self.edges(false);
        match target {
            Target::Path(path) => {
                path.compare(&start.path) != Ordering::Less
                    && path.compare(&end.path) != Ordering::Greater
            }
            Target::Point(point) => {
                point.compare(start) != Ordering::Less && point.compare(end) != Ordering::Greater
            }
            Target::Range(other) => {
                self.includes(Target::Point(&other.anchor))
                    || self.includes(Target::Point(&other.focus))
            }
        }
    }

    /// True when `other` lies entirely inside this range
    pub fn surrounds(&self, other: &Range) -> bool {
        let (start, end) = self.edges(false);
        let (other_start, other_end) = other.edges(false);
        start.compare(other_start) != Ordering::Greater && end.compare(other_end) != Ordering::Less
    }

    /// The overlapping part of two ranges, `None` when they are disjoint
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        let (s1, e1) = self.edges(false);
        let (s2, e2) = other.edges(false);
        let start = if s1.is_before(s2) { s2 } else { s1 };
        let end = if e1.is_before(e2) { e1 } else { e2 };
        if end.is_before(start) {
            None
        } else {
            Some(Range::new(start.clone(), end.clone()))
        }
    }
}
