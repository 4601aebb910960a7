use super::{ChildRepair, Constraint, Rule, Violation, ViolationKind};
use folio_model::{Document, ModelResult, Node, NodeRef, Operation, Path, PropertyPatch};

/// Every violation of `rule` at `node`. The caller has already checked that
/// the rule's matchers apply.
pub(super) fn check(rule: &Rule, doc: &Document, node: NodeRef<'_>, path: &Path) -> Vec<Violation> {
    let violation = |kind| Violation::new(rule.name.clone(), path.clone(), kind);

    // A void's children are placeholder content that no repair may touch
    if node.is_void() && repairs_children(&rule.constraint) {
        return Vec::new();
    }

    match &rule.constraint {
        Constraint::ChildCount { min, max } => {
            let found = node.children().len();
            if found < *min {
                vec![violation(ViolationKind::TooFewChildren { min: *min, found })]
            } else if let Some(max) = max.filter(|max| found > *max && !node.is_void()) {
                vec![violation(ViolationKind::TooManyChildren { max, found })]
            } else {
                vec![]
            }
        }

        Constraint::Children { allowed, repair } => node
            .children()
            .iter()
            .enumerate()
            .filter(|(_, child)| !allowed.matches(NodeRef::from(*child)))
            .map(|(index, _)| {
                violation(ViolationKind::DisallowedChild {
                    index,
                    repair: *repair,
                })
            })
            .collect(),

        Constraint::Parent { allowed } => match doc.parent(path) {
            Ok(parent) if !allowed.matches(parent) => vec![violation(ViolationKind::DisallowedParent)],
            _ => vec![],
        },

        Constraint::Attributes { required } => {
            let Some(attributes) = node.attributes() else {
                return vec![];
            };
            required
                .iter()
                .filter(|(key, value)| attributes.get(*key) != Some(*value))
                .map(|(key, value)| {
                    violation(ViolationKind::AttributeMismatch {
                        key: key.clone(),
                        expected: value.clone(),
                    })
                })
                .collect()
        }

        Constraint::NonEmpty => match node.as_element() {
            Some(element) if !element.is_void && element.children.is_empty() => {
                vec![violation(ViolationKind::Empty)]
            }
            _ => vec![],
        },

        Constraint::UniformChildren => uniform_children(node)
            .into_iter()
            .map(|index| violation(ViolationKind::MixedChildren { index }))
            .collect(),

        Constraint::InlineSpacing => inline_spacing(node)
            .into_iter()
            .map(|index| violation(ViolationKind::UnpaddedInline { index }))
            .collect(),

        Constraint::MergeAdjacentText => adjacent_texts(node)
            .into_iter()
            .map(|(index, mergeable)| {
                if mergeable {
                    violation(ViolationKind::MergeableText { index })
                } else {
                    violation(ViolationKind::EmptyText { index })
                }
            })
            .collect(),

        Constraint::Custom { rule } => rule.validate(doc, node, path),
    }
}

fn repairs_children(constraint: &Constraint) -> bool {
    matches!(
        constraint,
        Constraint::Children { .. }
            | Constraint::UniformChildren
            | Constraint::InlineSpacing
            | Constraint::MergeAdjacentText
    )
}

/// Indices of children whose block/inline level differs from what the parent
/// expects. The root only holds blocks; an element follows its own
/// inline-ness or, for a block, its first child.
fn uniform_children(node: NodeRef<'_>) -> Vec<usize> {
    let children = node.children();
    let expect_inline = match node {
        NodeRef::Root(_) => false,
        NodeRef::Element(element) => element.is_inline || children.first().map_or(true, Node::is_inline),
        NodeRef::Text(_) => return vec![],
    };
    children
        .iter()
        .enumerate()
        .filter(|(_, child)| child.is_inline() != expect_inline)
        .map(|(index, _)| index)
        .collect()
}

/// Indices where an empty text must be inserted so that every inline element
/// has a text leaf on both sides
fn inline_spacing(node: NodeRef<'_>) -> Vec<usize> {
    let children = node.children();
    let mut missing = Vec::new();
    for (index, child) in children.iter().enumerate() {
        if !child.is_element() || !child.is_inline() {
            continue;
        }
        if index == 0 || !children[index - 1].is_text() {
            missing.push(index);
        } else if index + 1 == children.len() {
            missing.push(index + 1);
        }
    }
    missing
}

/// Adjacent text pairs that should collapse: `(index, true)` when the text at
/// `index` merges into the previous one, `(index, false)` when the text at
/// `index` is an empty leaf to drop
fn adjacent_texts(node: NodeRef<'_>) -> Vec<(usize, bool)> {
    let children = node.children();
    let mut found = Vec::new();
    for index in 1..children.len() {
        let (Some(prev), Some(text)) = (children[index - 1].as_text(), children[index].as_text()) else {
            continue;
        };
        if prev.attributes == text.attributes {
            found.push((index, true));
        } else if prev.text.is_empty() {
            found.push((index - 1, false));
        } else if text.text.is_empty() {
            found.push((index, false));
        }
    }
    found
}

/// Operations that repair a built-in violation, applied in order. Empty when
/// there is nothing to do here (custom rules repair themselves).
pub(crate) fn repair_operations(doc: &Document, violation: &Violation) -> ModelResult<Vec<Operation>> {
    let path = &violation.path;

    let op = match &violation.kind {
        ViolationKind::TooFewChildren { .. } | ViolationKind::DisallowedParent => {
            if path.is_root() {
                return Ok(vec![]);
            }
            Operation::remove_at(doc, path)?
        }

        ViolationKind::TooManyChildren { .. } => {
            let Some(last) = doc.get(path)?.children().len().checked_sub(1) else {
                return Ok(vec![]);
            };
            Operation::remove_at(doc, &path.child(last))?
        }

        ViolationKind::DisallowedChild {
            index,
            repair: ChildRepair::Remove,
        }
        | ViolationKind::MixedChildren { index }
        | ViolationKind::EmptyText { index } => Operation::remove_at(doc, &path.child(*index))?,

        ViolationKind::DisallowedChild {
            index,
            repair: ChildRepair::Unwrap,
        } => return unwrap(doc, path, *index),

        ViolationKind::AttributeMismatch { key, expected } => {
            if path.is_root() {
                return Ok(vec![]);
            }
            let patch: PropertyPatch = [(key.clone(), Some(expected.clone()))].into_iter().collect();
            Operation::set_at(doc, path, patch)?
        }

        ViolationKind::Empty => Operation::InsertNode {
            path: path.child(0),
            node: Node::text(""),
        },

        ViolationKind::UnpaddedInline { index } => Operation::InsertNode {
            path: path.child(*index),
            node: Node::text(""),
        },

        ViolationKind::MergeableText { index } => Operation::merge_at(doc, &path.child(*index))?,

        ViolationKind::Custom { .. } => return Ok(vec![]),
    };

    Ok(vec![op])
}

/// Replace the child at `index` with its own children, then drop the emptied
/// wrapper. Text can't live directly under the root, so a wrapper holding
/// text at depth one is dropped whole.
fn unwrap(doc: &Document, parent: &Path, index: usize) -> ModelResult<Vec<Operation>> {
    let wrapper = parent.child(index);
    let node = doc.node(&wrapper)?;
    let children = node.children();

    if parent.is_root() && children.iter().any(Node::is_text) {
        return Ok(vec![Operation::remove_at(doc, &wrapper)?]);
    }

    // Each hoisted child lands where the wrapper was, pushing it one right
    let mut ops: Vec<Operation> = (0..children.len())
        .map(|hoisted| {
            let at = parent.child(index + hoisted);
            Operation::MoveNode {
                path: at.child(0),
                new_path: at,
            }
        })
        .collect();

    let mut emptied = node.clone();
    if let Node::Element(element) = &mut emptied {
        element.children.clear();
    }
    ops.push(Operation::RemoveNode {
        path: parent.child(index + children.len()),
        node: emptied,
    });
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Matcher, Schema};
    use folio_model::{Element, Text};
    use serde_json::json;

    fn first_violation(schema: &Schema, doc: &Document, path: &Path) -> Option<Violation> {
        let node = doc.get(path).unwrap();
        schema.first_violation(doc, node, path).map(|(_, v)| v)
    }

    fn link(text: &str) -> Node {
        Node::Element(Element::new("link").inline().with_children(vec![Node::text(text)]))
    }

    #[test]
    fn test_child_count_bounds() {
        let rule = Rule::new(
            "pair",
            Matcher::kind("pair"),
            Constraint::ChildCount { min: 1, max: Some(2) },
        );
        let doc = Document::new(vec![Node::element(
            "pair",
            vec![Node::text("a"), Node::text("b"), Node::text("c")],
        )]);
        let node = doc.get(&Path::from([0])).unwrap();
        let violations = check(&rule, &doc, node, &Path::from([0]));
        assert_eq!(violations[0].kind, ViolationKind::TooManyChildren { max: 2, found: 3 });

        let op = repair_operations(&doc, &violations[0]).unwrap().remove(0);
        assert_eq!(
            op,
            Operation::RemoveNode {
                path: Path::from([0, 2]),
                node: Node::text("c")
            }
        );
    }

    #[test]
    fn test_too_few_children_on_root_is_left_alone() {
        let doc = Document::new(vec![]);
        let violation = Violation::new("root", Path::root(), ViolationKind::TooFewChildren { min: 1, found: 0 });
        assert!(repair_operations(&doc, &violation).unwrap().is_empty());
    }

    #[test]
    fn test_empty_element_gets_a_text() {
        let doc = Document::new(vec![Node::element("paragraph", vec![])]);
        let violation = first_violation(&Schema::core(), &doc, &Path::from([0])).unwrap();
        assert_eq!(violation.rule, "non-empty");
        assert_eq!(
            repair_operations(&doc, &violation).unwrap(),
            vec![Operation::InsertNode {
                path: Path::from([0, 0]),
                node: Node::text("")
            }]
        );
    }

    #[test]
    fn test_void_elements_may_be_empty() {
        let doc = Document::new(vec![Node::Element(Element::new("image").void())]);
        assert_eq!(first_violation(&Schema::core(), &doc, &Path::from([0])), None);
    }

    #[test]
    fn test_void_placeholder_content_is_not_repaired() {
        let doc = Document::new(vec![Node::Element(Element::new("embed").void().with_children(vec![
            Node::text("a"),
            Node::text("b"),
            Node::Element(Element::new("link").inline().with_children(vec![Node::text("c")])),
        ]))]);
        assert_eq!(first_violation(&Schema::core(), &doc, &Path::from([0])), None);
        assert!(Schema::core().validate(&doc).is_empty());
    }

    #[test]
    fn test_mixed_children_follow_first_child() {
        let doc = Document::new(vec![Node::element(
            "quote",
            vec![Node::element("paragraph", vec![Node::text("a")]), Node::text("loose")],
        )]);
        let violation = first_violation(&Schema::core(), &doc, &Path::from([0])).unwrap();
        assert_eq!(violation.kind, ViolationKind::MixedChildren { index: 1 });
        assert_eq!(
            repair_operations(&doc, &violation).unwrap(),
            vec![Operation::RemoveNode {
                path: Path::from([0, 1]),
                node: Node::text("loose")
            }]
        );
    }

    #[test]
    fn test_inline_padding_positions() {
        let doc = Document::new(vec![
            Node::element("paragraph", vec![link("a")]),
            Node::element("paragraph", vec![Node::text("x"), link("a")]),
            Node::element("paragraph", vec![Node::text("x"), link("a"), link("b"), Node::text("y")]),
        ]);
        let found: Vec<ViolationKind> = (0..3)
            .map(|i| first_violation(&Schema::core(), &doc, &Path::from([i])).unwrap().kind)
            .collect();
        assert_eq!(
            found,
            vec![
                ViolationKind::UnpaddedInline { index: 0 },
                ViolationKind::UnpaddedInline { index: 2 },
                ViolationKind::UnpaddedInline { index: 2 },
            ]
        );
    }

    #[test]
    fn test_adjacent_text_cases() {
        let doc = Document::new(vec![
            Node::element("paragraph", vec![Node::text("a"), Node::text("b")]),
            Node::element("paragraph", vec![Node::text(""), Node::Text(Text::new("b").mark("bold"))]),
            Node::element("paragraph", vec![Node::Text(Text::new("a").mark("bold")), Node::text("")]),
            Node::element("paragraph", vec![Node::Text(Text::new("a").mark("bold")), Node::text("b")]),
        ]);
        let found: Vec<Option<ViolationKind>> = (0..4)
            .map(|i| first_violation(&Schema::core(), &doc, &Path::from([i])).map(|v| v.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                Some(ViolationKind::MergeableText { index: 1 }),
                Some(ViolationKind::EmptyText { index: 0 }),
                Some(ViolationKind::EmptyText { index: 1 }),
                None,
            ]
        );

        let merge = repair_operations(
            &doc,
            &Violation::new("merge-adjacent-text", Path::from([0]), ViolationKind::MergeableText { index: 1 }),
        )
        .unwrap();
        assert_eq!(merge, vec![Operation::merge_at(&doc, &Path::from([0, 1])).unwrap()]);
    }

    #[test]
    fn test_unwrap_hoists_every_child_then_drops_wrapper() {
        let original = Document::new(vec![Node::element(
            "list",
            vec![
                Node::element("item", vec![Node::text("a")]),
                Node::element(
                    "wrapper",
                    vec![
                        Node::element("item", vec![Node::text("b")]),
                        Node::element("item", vec![Node::text("c")]),
                    ],
                ),
            ],
        )]);
        let violation = Violation::new(
            "list-items",
            Path::from([0]),
            ViolationKind::DisallowedChild {
                index: 1,
                repair: ChildRepair::Unwrap,
            },
        );
        let ops = repair_operations(&original, &violation).unwrap();
        assert_eq!(
            ops[..2],
            [
                Operation::MoveNode {
                    path: Path::from([0, 1, 0]),
                    new_path: Path::from([0, 1]),
                },
                Operation::MoveNode {
                    path: Path::from([0, 2, 0]),
                    new_path: Path::from([0, 2]),
                },
            ]
        );

        let mut doc = original.clone();
        for op in &ops {
            op.apply(&mut doc).unwrap();
        }
        let kids: Vec<String> = doc.get(&Path::from([0])).unwrap().children().iter().map(Node::string).collect();
        assert_eq!(kids, vec!["a", "b", "c"]);
        assert_eq!(doc.get(&Path::from([0])).unwrap().children().len(), 3);
    }

    #[test]
    fn test_unwrap_at_root_drops_text_wrappers() {
        let doc = Document::new(vec![Node::element("span", vec![Node::text("a")])]);
        let violation = Violation::new(
            "blocks",
            Path::root(),
            ViolationKind::DisallowedChild {
                index: 0,
                repair: ChildRepair::Unwrap,
            },
        );
        let ops = repair_operations(&doc, &violation).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], Operation::RemoveNode { path, .. } if *path == Path::from([0])));
    }

    #[test]
    fn test_attribute_repair_records_prior_value() {
        let doc = Document::new(vec![Node::Element(
            Element::new("heading").with_attribute("level", 7).with_children(vec![Node::text("h")]),
        )]);
        let violation = Violation::new(
            "heading-level",
            Path::from([0]),
            ViolationKind::AttributeMismatch {
                key: "level".into(),
                expected: json!(1),
            },
        );
        let op = repair_operations(&doc, &violation).unwrap().remove(0);
        let Operation::SetNode {
            properties,
            new_properties,
            ..
        } = op
        else {
            panic!("expected set_node, got {:?}", op);
        };
        assert_eq!(properties.get("level"), Some(&Some(json!(7))));
        assert_eq!(new_properties.get("level"), Some(&Some(json!(1))));
    }
}
