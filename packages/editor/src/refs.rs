//! # Live References
//!
//! Locations that stay current while the document changes underneath them.
//!
//! A handle is a small `Copy` key into a registry the [`Editor`] owns. Every
//! applied operation transforms each registered value with its stored
//! affinity. Once the target is deleted the value becomes `None` and stays
//! `None` until the handle is released.
//!
//! ```text
//! path_ref([1, 0]) ──► apply(insert_node [0]) ──► current == [2, 0]
//!                  ──► apply(remove_node [2]) ──► current == None
//! ```

use crate::editor::Editor;
use folio_model::{transform_path, transform_point, transform_range, Affinity, Operation, Path, Point, Range, RangeAffinity};
use std::collections::BTreeMap;

/// Stable key of a registered reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(u64);

/// Tracked value plus the affinity it is transformed with
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tracked {
    Path { value: Option<Path>, affinity: Affinity },
    Point { value: Option<Point>, affinity: Affinity },
    Range { value: Option<Range>, affinity: RangeAffinity },
}

impl Tracked {
    fn transform(&mut self, op: &Operation) {
        match self {
            Tracked::Path { value, affinity } => {
                *value = value.as_ref().and_then(|path| transform_path(path, op, *affinity));
            }
            Tracked::Point { value, affinity } => {
                *value = value.as_ref().and_then(|point| transform_point(point, op, *affinity));
            }
            Tracked::Range { value, affinity } => {
                *value = value.as_ref().and_then(|range| transform_range(range, op, *affinity));
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RefRegistry {
    next_id: u64,
    entries: BTreeMap<RefId, Tracked>,
}

impl RefRegistry {
    pub fn insert(&mut self, tracked: Tracked) -> RefId {
        let id = RefId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, tracked);
        id
    }

    pub fn get(&self, id: RefId) -> Option<&Tracked> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: RefId) -> Option<Tracked> {
        self.entries.remove(&id)
    }

    /// Carry every live value through an applied operation
    pub fn transform(&mut self, op: &Operation) {
        if op.is_selection() {
            return;
        }
        for tracked in self.entries.values_mut() {
            tracked.transform(op);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $value:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            id: RefId,
        }

        impl $name {
            pub(crate) fn new(id: RefId) -> Self {
                Self { id }
            }

            pub fn id(&self) -> RefId {
                self.id
            }

            /// Current value, `None` once the target is gone or the handle was
            /// released
            pub fn current(&self, editor: &Editor) -> Option<$value> {
                match editor.refs().get(self.id)? {
                    Tracked::$variant { value, .. } => value.clone(),
                    _ => None,
                }
            }

            /// Stop tracking and return the final value
            pub fn unref(self, editor: &mut Editor) -> Option<$value> {
                match editor.refs_mut().remove(self.id)? {
                    Tracked::$variant { value, .. } => value,
                    _ => None,
                }
            }
        }
    };
}

handle!(
    /// Handle to a tracked [`Path`]
    PathRef,
    Path,
    Path
);
handle!(
    /// Handle to a tracked [`Point`]
    PointRef,
    Point,
    Point
);
handle!(
    /// Handle to a tracked [`Range`]
    RangeRef,
    Range,
    Range
);

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::Node;

    #[test]
    fn test_registry_tracks_until_removed() {
        let mut registry = RefRegistry::default();
        let id = registry.insert(Tracked::Path {
            value: Some(Path::from([1, 0])),
            affinity: Affinity::Forward,
        });

        registry.transform(&Operation::InsertNode {
            path: Path::from([0]),
            node: Node::element("paragraph", vec![Node::text("")]),
        });
        assert_eq!(
            registry.get(id),
            Some(&Tracked::Path {
                value: Some(Path::from([2, 0])),
                affinity: Affinity::Forward
            })
        );

        registry.transform(&Operation::RemoveNode {
            path: Path::from([2]),
            node: Node::element("paragraph", vec![Node::text("")]),
        });
        registry.transform(&Operation::InsertNode {
            path: Path::from([0]),
            node: Node::element("paragraph", vec![Node::text("")]),
        });
        assert!(matches!(registry.get(id), Some(Tracked::Path { value: None, .. })));

        assert!(registry.remove(id).is_some());
        assert_eq!(registry.len(), 0);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut registry = RefRegistry::default();
        let tracked = Tracked::Point {
            value: Some(Point::new([0, 0], 0)),
            affinity: Affinity::Backward,
        };
        let first = registry.insert(tracked.clone());
        registry.remove(first);
        let second = registry.insert(tracked);
        assert_ne!(first, second);
    }
}
