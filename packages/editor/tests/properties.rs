//! Property-based tests for the editing session
//!
//! After any sequence of edits applied through the editor:
//!  - the document satisfies the core rules
//!  - normalizing again applies nothing (fixed point)
//!  - the selection, when present, addresses real positions
//!  - undoing every logged operation in reverse restores the start

use folio_editor::folio_model::{Document, Node, NodesOptions, Operation, Path, Point, PropertyPatch, Range};
use folio_editor::{Editor, Schema};
use proptest::prelude::*;
use serde_json::json;

fn document_strategy() -> impl Strategy<Value = Document> {
    prop::collection::vec("[a-z]{1,6}", 1..4).prop_map(|blocks| {
        Document::new(
            blocks
                .into_iter()
                .map(|text| Node::element("paragraph", vec![Node::text(text)]))
                .collect(),
        )
    })
}

fn edit_strategy() -> impl Strategy<Value = Vec<(usize, Vec<usize>)>> {
    prop::collection::vec((0usize..8, prop::collection::vec(0usize..1000, 3)), 1..12)
}

fn leaves(doc: &Document) -> Vec<(Path, usize)> {
    doc.texts(&Path::root())
        .map(|texts| {
            texts
                .into_iter()
                .map(|(text, path)| (path, text.utf16_len()))
                .collect()
        })
        .unwrap_or_default()
}

/// Build an edit of `kind` against the current document
fn edit_for(doc: &Document, kind: usize, seeds: &[usize]) -> Option<Operation> {
    let blocks = doc.children.len();
    let leaves = leaves(doc);
    if leaves.is_empty() || blocks == 0 {
        return Some(Operation::InsertNode {
            path: Path::from([0]),
            node: Node::element("paragraph", vec![Node::text("fresh")]),
        });
    }
    let (leaf, len) = leaves[seeds[0] % leaves.len()].clone();

    let op = match kind {
        0 => Operation::InsertText {
            path: leaf,
            offset: seeds[1] % (len + 1),
            text: "ab".into(),
        },
        1 => {
            let offset = seeds[1] % (len + 1);
            Operation::remove_text_at(doc, &leaf, offset, seeds[2] % (len - offset + 1)).ok()?
        }
        2 => Operation::split_at(&leaf, seeds[1] % (len + 1)),
        3 => {
            let block = Path::from([seeds[1] % blocks]);
            let size = doc.get(&block).ok()?.children().len();
            Operation::split_at(&block, seeds[2] % (size + 1))
        }
        4 => Operation::merge_at(doc, &Path::from([1 + seeds[1] % blocks.max(2).saturating_sub(1)])).ok()?,
        5 => {
            let paths: Vec<Path> = doc.nodes(NodesOptions::default()).map(|(_, p)| p).skip(1).collect();
            Operation::remove_at(doc, &paths[seeds[1] % paths.len()]).ok()?
        }
        6 => {
            let mut patch = PropertyPatch::new();
            patch.insert("bold".into(), if seeds[1] % 2 == 0 { Some(json!(true)) } else { None });
            Operation::set_at(doc, &leaf, patch).ok()?
        }
        _ => Operation::InsertNode {
            path: Path::from([seeds[1] % (blocks + 1)]),
            node: Node::element("paragraph", vec![Node::text("new")]),
        },
    };
    Some(op)
}

proptest! {
    #[test]
    fn edits_keep_document_normalized(doc in document_strategy(), edits in edit_strategy()) {
        let mut editor = Editor::new(doc);
        let start = editor.start(Path::root()).unwrap();
        editor.select(Range::collapsed(start)).unwrap();

        for (kind, seeds) in edits {
            let Some(op) = edit_for(editor.document(), kind, &seeds) else { continue };
            if editor.apply(op).is_err() {
                continue;
            }

            let document = editor.document();
            prop_assert!(Schema::core().validate(document).is_empty());
            if let Some(selection) = editor.selection() {
                prop_assert!(document.validate_point(&selection.anchor).is_ok());
                prop_assert!(document.validate_point(&selection.focus).is_ok());
            }
        }

        let logged = editor.operations().len();
        editor.normalize(true).unwrap();
        prop_assert_eq!(editor.operations().len(), logged);
    }

    #[test]
    fn undoing_the_log_restores_the_start(doc in document_strategy(), edits in edit_strategy()) {
        let mut editor = Editor::new(doc.clone());
        for (kind, seeds) in edits {
            if let Some(op) = edit_for(editor.document(), kind, &seeds) {
                let _ = editor.apply(op);
            }
        }

        let ops = editor.take_operations();
        editor.set_normalizing(false);
        for op in ops.iter().rev() {
            editor.apply(op.inverse()).unwrap();
        }
        prop_assert_eq!(editor.document(), &doc);
    }

    #[test]
    fn point_refs_stay_on_real_positions(doc in document_strategy(), edits in edit_strategy()) {
        let mut editor = Editor::new(doc);
        let end = editor.end(Path::root()).unwrap();
        let caret = editor.point_ref(end, Default::default());
        let first = editor.point_ref(Point::new([0, 0], 0), Default::default());

        for (kind, seeds) in edits {
            if let Some(op) = edit_for(editor.document(), kind, &seeds) {
                let _ = editor.apply(op);
            }
            for handle in [caret, first] {
                if let Some(point) = handle.current(&editor) {
                    prop_assert!(editor.document().validate_point(&point).is_ok());
                }
            }
        }
    }
}
