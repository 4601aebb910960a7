//! Property-based tests for the operation algebra
//!
//! These hold for every document and every operation that applies cleanly:
//!  - Round-trip: applying an operation and then its inverse restores the tree
//!  - Deletion totality: a path transformed through `remove_node` is `None`
//!    exactly when it was inside the removed subtree
//!  - Move inverse: paths carried through a move and back return home, for
//!    every node and every child slot of a nested document

use folio_model::{
    transform_path, Affinity, Document, Node, NodesOptions, Operation, Path, PropertyPatch,
};
use proptest::prelude::*;
use serde_json::json;

/// Generate strategies for prop-testing

fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::vec(prop::collection::vec("[a-z]{0,6}", 1..4), 1..4).prop_map(|blocks| {
        Document::new(
            blocks
                .into_iter()
                .map(|texts| Node::element("paragraph", texts.into_iter().map(Node::text).collect()))
                .collect(),
        )
    })
}

fn paragraph_strategy() -> impl Strategy<Value = Node> {
    prop::collection::vec("[a-z]{0,4}", 1..3)
        .prop_map(|texts| Node::element("paragraph", texts.into_iter().map(Node::text).collect()))
}

/// Paragraphs nested in up to three levels of quotes
fn nested_document_strategy() -> impl Strategy<Value = Document> {
    let block = paragraph_strategy().prop_recursive(3, 12, 3, |inner| {
        prop::collection::vec(inner, 1..3).prop_map(|children| Node::element("quote", children))
    });
    prop::collection::vec(block, 1..4).prop_map(Document::new)
}

fn seeds_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..1000, 4)
}

fn all_paths(doc: &Document) -> Vec<Path> {
    doc.nodes(NodesOptions::default()).map(|(_, path)| path).collect()
}

/// Every position a node could be inserted at: each child index of the root
/// and of every element, plus one past the end
fn child_slots(doc: &Document) -> Vec<Path> {
    doc.nodes(NodesOptions::default())
        .filter(|(node, _)| !node.is_text())
        .flat_map(|(node, path)| (0..=node.children().len()).map(move |index| path.child(index)))
        .collect()
}

/// Text leaves with their lengths
fn leaves(doc: &Document) -> Vec<(Path, usize)> {
    doc.texts(&Path::root())
        .unwrap()
        .into_iter()
        .map(|(text, path)| (path, text.utf16_len()))
        .collect()
}

fn block_len(doc: &Document, index: usize) -> usize {
    doc.get(&Path::from([index])).unwrap().children().len()
}

/// Build a well-formed operation of `kind` against `doc`, steered by `seeds`
fn operation_for(doc: &Document, kind: usize, seeds: &[usize]) -> Operation {
    let leaves = leaves(doc);
    let blocks = doc.children.len();
    let (leaf, len) = leaves[seeds[0] % leaves.len()].clone();

    match kind {
        0 => Operation::InsertText {
            path: leaf,
            offset: seeds[1] % (len + 1),
            text: "xy".into(),
        },
        1 => {
            let offset = seeds[1] % (len + 1);
            let count = seeds[2] % (len - offset + 1);
            Operation::remove_text_at(doc, &leaf, offset, count).unwrap()
        }
        2 => Operation::split_at(&leaf, seeds[1] % (len + 1)),
        3 => {
            let block = seeds[1] % blocks;
            Operation::split_at(&Path::from([block]), seeds[2] % (block_len(doc, block) + 1))
        }
        4 => {
            let mut candidates: Vec<Path> = leaves
                .iter()
                .map(|(path, _)| path.clone())
                .filter(Path::has_previous)
                .collect();
            candidates.extend((1..blocks).map(|index| Path::from([index])));
            match candidates.get(seeds[1] % candidates.len().max(1)) {
                Some(path) => Operation::merge_at(doc, path).unwrap(),
                None => Operation::split_at(&leaf, 0),
            }
        }
        5 => {
            let paths = all_paths(doc);
            let path = &paths[1 + seeds[1] % (paths.len() - 1)];
            Operation::remove_at(doc, path).unwrap()
        }
        6 => {
            if seeds[1] % 2 == 0 {
                Operation::InsertNode {
                    path: Path::from([seeds[2] % (blocks + 1)]),
                    node: Node::element("quote", vec![Node::text("q")]),
                }
            } else {
                let block = seeds[2] % blocks;
                Operation::InsertNode {
                    path: Path::from([block, seeds[3] % (block_len(doc, block) + 1)]),
                    node: Node::text("new"),
                }
            }
        }
        7 => {
            if seeds[1] % 2 == 0 {
                let block = seeds[2] % blocks;
                let mut room = block_len(doc, block);
                if leaf.parent() != Some(Path::from([block])) {
                    room += 1;
                }
                Operation::MoveNode {
                    path: leaf,
                    new_path: Path::from([block, seeds[3] % room]),
                }
            } else {
                Operation::MoveNode {
                    path: Path::from([seeds[2] % blocks]),
                    new_path: Path::from([seeds[3] % blocks]),
                }
            }
        }
        _ => {
            let paths = all_paths(doc);
            let path = &paths[1 + seeds[1] % (paths.len() - 1)];
            let mut patch = PropertyPatch::new();
            if seeds[2] % 2 == 0 {
                patch.insert("bold".into(), Some(json!(true)));
            } else {
                patch.insert("type".into(), None);
            }
            Operation::set_at(doc, path, patch).unwrap()
        }
    }
}

proptest! {
    #[test]
    fn inverse_restores_document(
        doc in document_strategy(),
        kind in 0usize..9,
        seeds in seeds_strategy()
    ) {
        let op = operation_for(&doc, kind, &seeds);
        let mut edited = doc.clone();
        prop_assume!(op.apply(&mut edited).is_ok());

        op.inverse().apply(&mut edited).unwrap();
        prop_assert_eq!(edited, doc);
    }

    #[test]
    fn inverse_of_inverse_is_identity(
        doc in document_strategy(),
        kind in 0usize..9,
        seeds in seeds_strategy()
    ) {
        let op = operation_for(&doc, kind, &seeds);
        let mut edited = doc.clone();
        prop_assume!(op.apply(&mut edited).is_ok());
        prop_assume!(!matches!(op, Operation::MoveNode { ref path, ref new_path } if path == new_path));

        prop_assert_eq!(op.inverse().inverse(), op);
    }

    #[test]
    fn removed_paths_vanish_and_others_resolve(
        doc in document_strategy(),
        seeds in seeds_strategy()
    ) {
        let op = operation_for(&doc, 5, &seeds);
        let Operation::RemoveNode { path: removed, .. } = &op else {
            unreachable!("kind 5 always removes");
        };
        let mut edited = doc.clone();
        op.apply(&mut edited).unwrap();

        for path in all_paths(&doc) {
            let moved = transform_path(&path, &op, Affinity::Forward);
            if removed.is_common(&path) {
                prop_assert_eq!(moved, None);
            } else {
                let moved = moved.unwrap();
                prop_assert!(edited.has(&moved));
                if !path.is_ancestor(removed) {
                    prop_assert_eq!(edited.get(&moved).unwrap(), doc.get(&path).unwrap());
                }
            }
        }
    }

    #[test]
    fn move_and_inverse_return_paths_home(
        doc in document_strategy(),
        seeds in seeds_strategy()
    ) {
        let op = operation_for(&doc, 7, &seeds);
        let mut edited = doc.clone();
        prop_assume!(op.apply(&mut edited).is_ok());
        let inverse = op.inverse();

        for path in all_paths(&doc) {
            let there = transform_path(&path, &op, Affinity::Forward).unwrap();
            let back = transform_path(&there, &inverse, Affinity::Forward).unwrap();
            prop_assert_eq!(&back, &path);

            if let Some(text) = doc.get(&path).unwrap().as_text() {
                prop_assert_eq!(&edited.leaf(&there).unwrap().text, &text.text);
            }
        }
    }

    #[test]
    fn selection_stays_valid(
        doc in document_strategy(),
        kind in 0usize..9,
        seeds in seeds_strategy()
    ) {
        let mut doc = doc;
        let end = doc.end(&Path::root()).unwrap();
        let range = folio_model::Range::collapsed(end);
        Operation::select(&doc, &range).apply(&mut doc).unwrap();

        let op = operation_for(&doc, kind, &seeds);
        prop_assume!(op.apply(&mut doc).is_ok());

        if let Some(selection) = &doc.selection {
            prop_assert!(doc.validate_point(&selection.anchor).is_ok());
            prop_assert!(doc.validate_point(&selection.focus).is_ok());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_nested_move_inverts_and_carries_paths(doc in nested_document_strategy()) {
        let paths = all_paths(&doc);
        let slots = child_slots(&doc);
        let mut applied = 0;

        for path in paths.iter().skip(1) {
            for new_path in &slots {
                let op = Operation::MoveNode {
                    path: path.clone(),
                    new_path: new_path.clone(),
                };
                if op.validate(&doc).is_err() {
                    continue;
                }
                let mut edited = doc.clone();
                op.apply(&mut edited).unwrap();
                applied += 1;

                let inverse = op.inverse();
                for tracked in &paths {
                    let there = transform_path(tracked, &op, Affinity::Forward).unwrap();
                    let back = transform_path(&there, &inverse, Affinity::Forward).unwrap();
                    prop_assert_eq!(&back, tracked, "{:?}", op);

                    if let Some(text) = doc.get(tracked).unwrap().as_text() {
                        prop_assert_eq!(&edited.leaf(&there).unwrap().text, &text.text, "{:?}", op);
                    }
                }

                inverse.apply(&mut edited).unwrap();
                prop_assert_eq!(&edited, &doc, "{:?}", op);
            }
        }
        prop_assert!(applied > 0);
    }
}
