use guidebook_core::{
    BlockBody, BlockEditor, BlockKind, BlockPatch, MoveDirection, NamedLink, StoredSection,
};
use serde_json::json;
use std::collections::HashSet;

fn assert_unique_ids(editor: &BlockEditor) {
    let ids: HashSet<_> = editor.blocks().iter().map(|block| block.id).collect();
    assert_eq!(ids.len(), editor.len());
}

#[test]
fn length_tracks_adds_and_deletes_with_unique_ids() {
    let mut editor = BlockEditor::new();
    let mut live = Vec::new();
    let mut adds = 0usize;
    let mut deletes = 0usize;

    for step in 0..60usize {
        let kind = BlockKind::ALL[step % BlockKind::ALL.len()];
        if step % 3 == 2 && !live.is_empty() {
            let id = live.remove(step % live.len());
            assert!(editor.delete_block(id));
            deletes += 1;
        } else {
            let after = if step % 2 == 0 { Some(step / 2) } else { None };
            live.push(editor.add_block(kind, after));
            adds += 1;
        }
        if step % 5 == 0 && editor.len() > 1 {
            editor.move_block(step % editor.len(), MoveDirection::Up);
        }
        assert_eq!(editor.len(), adds - deletes);
        assert_unique_ids(&editor);
    }
}

#[test]
fn unknown_ids_are_no_ops() {
    let mut editor = BlockEditor::new();
    editor.add_block(BlockKind::Text, None);
    let before = editor.clone();
    let stranger = uuid::Uuid::new_v4();

    assert!(!editor.delete_block(stranger));
    assert!(!editor.update_block(stranger, [BlockPatch::Content("x".to_string())]));
    assert!(!editor.convert_block(stranger, BlockKind::Heading));
    assert!(!editor.push_item(stranger));
    assert!(!editor.remove_item(stranger, 0));
    assert_eq!(editor, before);
}

#[test]
fn move_at_boundaries_is_a_no_op() {
    let mut editor = BlockEditor::new();
    let first = editor.add_block(BlockKind::Heading, None);
    let second = editor.add_block(BlockKind::Text, None);

    assert!(!editor.move_block(0, MoveDirection::Up));
    assert!(!editor.move_block(1, MoveDirection::Down));
    assert!(!editor.move_block(7, MoveDirection::Up));
    assert_eq!(editor.position(first), Some(0));

    assert!(editor.move_block(0, MoveDirection::Down));
    assert_eq!(editor.position(first), Some(1));
    assert_eq!(editor.position(second), Some(0));
}

#[test]
fn converting_to_same_kind_changes_nothing() {
    let mut editor = BlockEditor::new();
    let id = editor.add_block(BlockKind::Links, None);
    editor.update_block(
        id,
        [BlockPatch::NamedLinks(vec![NamedLink::new(
            "City hall",
            "https://maps.example/city-hall",
        )])],
    );
    let before = editor.clone();

    assert!(editor.convert_block(id, BlockKind::Links));
    assert_eq!(editor, before);
}

#[test]
fn conversion_keeps_identity_and_compatible_content() {
    let mut editor = BlockEditor::new();
    let id = editor.add_block(BlockKind::Text, None);
    editor.update_block(id, [BlockPatch::Content("Bring your passport".to_string())]);

    assert!(editor.convert_block(id, BlockKind::Heading));
    assert_eq!(editor.get(id).unwrap().body.content(), Some("Bring your passport"));

    assert!(editor.convert_block(id, BlockKind::List));
    assert_eq!(
        editor.get(id).unwrap().body,
        BlockBody::List {
            items: vec!["Bring your passport".to_string()]
        }
    );

    assert!(editor.convert_block(id, BlockKind::AppLinks));
    assert_eq!(editor.get(id).unwrap().body, BlockBody::empty(BlockKind::AppLinks));
    assert_eq!(editor.position(id), Some(0));
}

#[test]
fn items_can_be_pushed_and_removed() {
    let mut editor = BlockEditor::new();
    let id = editor.add_block(BlockKind::List, None);

    assert!(editor.push_item(id));
    assert!(editor.push_item(id));
    editor.update_block(id, [BlockPatch::Items(vec!["a".to_string(), "b".to_string()])]);
    assert!(editor.remove_item(id, 0));
    assert!(!editor.remove_item(id, 5));
    assert_eq!(
        editor.get(id).unwrap().body,
        BlockBody::List {
            items: vec!["b".to_string()]
        }
    );

    let delimiter = editor.add_block(BlockKind::Delimiter, None);
    assert!(!editor.push_item(delimiter));
}

#[test]
fn from_sections_assigns_fresh_ids_and_drops_unknown_shapes() {
    let sections: Vec<StoredSection> = serde_json::from_value(json!([
        {"type": "heading", "content": "Step one"},
        {"type": "unknown_future_type", "payload": 1},
        {"type": "delimiter"}
    ]))
    .unwrap();

    let first = BlockEditor::from_sections(&sections);
    let second = BlockEditor::from_sections(&sections);

    assert_eq!(first.len(), 2);
    assert_eq!(first.blocks()[0].kind(), BlockKind::Heading);
    assert_eq!(first.blocks()[1].kind(), BlockKind::Delimiter);
    assert_ne!(first.blocks()[0].id, second.blocks()[0].id);
    assert_unique_ids(&first);
}

#[test]
fn split_sections_anchors_unknown_shapes_to_the_preceding_block() {
    let sections: Vec<StoredSection> = serde_json::from_value(json!([
        {"type": "poll", "question": "?"},
        {"type": "text", "content": "Intro"},
        {"type": "video", "url": "v1"},
        {"type": "map", "pin": "p1"}
    ]))
    .unwrap();

    let (editor, preserved) = BlockEditor::split_sections(&sections);
    let intro = editor.blocks()[0].id;

    assert_eq!(editor.len(), 1);
    assert_eq!(preserved.len(), 3);
    assert_eq!(preserved[0].after, None);
    assert_eq!(preserved[0].raw, json!({"type": "poll", "question": "?"}));
    assert_eq!(preserved[1].after, Some(intro));
    assert_eq!(preserved[2].after, Some(intro));
}
