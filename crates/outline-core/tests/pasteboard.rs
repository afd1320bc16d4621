use outline_core::pasteboard::{ITEM_REFERENCE_TYPE, PLAIN_TEXT_TYPE, URI_LIST_TYPE};
use outline_core::{
    DocumentModel, DragSource, ItemPayload, MemoryOutline, OutlineEditor, OutlineTextStorage,
    Pasteboard, PasteboardContent,
};
use pretty_assertions::assert_eq;

#[test]
fn test_branches_survive_a_trip_between_documents() {
    let source = MemoryOutline::from_outline_text(
        "Inbox:\n\t- read https://example.com/a @today\n\t\tnotes\nWork:\n",
    );
    let inbox = source.find("Inbox:").unwrap();

    let payload = ItemPayload::capture(&source, &[inbox], Some("doc-a")).unwrap();
    let mut pasteboard = Pasteboard::new();
    pasteboard.write_items(&payload).unwrap();
    assert_eq!(
        pasteboard.types(),
        vec![ITEM_REFERENCE_TYPE, PLAIN_TEXT_TYPE, URI_LIST_TYPE]
    );
    assert_eq!(
        pasteboard.get(PLAIN_TEXT_TYPE),
        Some("Inbox:\n\t- read https://example.com/a @today\n\t\tnotes\n")
    );
    assert_eq!(pasteboard.get(URI_LIST_TYPE), Some("https://example.com/a"));

    let Some(PasteboardContent::Items(read)) = pasteboard.read().unwrap() else {
        panic!("expected an item payload");
    };
    assert_eq!(read, payload);

    let mut storage =
        OutlineTextStorage::new(MemoryOutline::from_outline_text("Other:\n")).unwrap();
    assert!(matches!(
        DragSource::from_payload(read.clone(), "doc-b", storage.model()),
        DragSource::Foreign(_)
    ));

    let root = storage.model().root();
    let inserted = storage
        .perform_model_edit(|m| {
            let ids = m.deserialize_branches(&read.items)?;
            m.insert_children(root, &ids, None)?;
            Ok(ids)
        })
        .unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(
        storage.text(),
        "Other:\nInbox:\n- read https://example.com/a @today\nnotes\n"
    );
    assert_eq!(
        storage.model().serialize_branches(&inserted).unwrap(),
        read.items
    );
}

#[test]
fn test_payload_from_the_same_document_is_local() {
    let model = MemoryOutline::from_outline_text("a\nb\n");
    let a = model.find("a").unwrap();
    let payload = ItemPayload::capture(&model, &[a], Some("doc")).unwrap();
    let json = payload.to_json().unwrap();
    let parsed = ItemPayload::from_json(&json).unwrap();
    assert_eq!(
        DragSource::from_payload(parsed, "doc", &model),
        DragSource::Local(vec![a])
    );
}

#[test]
fn test_plain_text_paste_inserts_after_the_caret_item() {
    let model = MemoryOutline::from_outline_text("one\ntwo\n");
    let mut editor = OutlineEditor::with_defaults(model, 400.0).unwrap();
    let mut pasteboard = Pasteboard::new();
    pasteboard.set(PLAIN_TEXT_TYPE, "x\n\ty\n\n");

    editor.set_selection(1..1);
    let inserted = editor.paste(&pasteboard).unwrap();

    assert_eq!(inserted.len(), 1);
    assert_eq!(editor.storage().text(), "one\nx\ny\ntwo\n");
    assert_eq!(editor.model().to_outline_text(), "one\nx\n\ty\ntwo\n");
    assert_eq!(editor.selected_nodes(), inserted);
}

#[test]
fn test_copy_then_paste_duplicates_the_selection() {
    let model = MemoryOutline::from_outline_text("p\n\tc\nq\n");
    let mut editor = OutlineEditor::with_defaults(model, 400.0).unwrap();
    let mut pasteboard = Pasteboard::new();

    editor.set_selection(0..3);
    editor.copy_selection(&mut pasteboard).unwrap();
    assert_eq!(pasteboard.get(PLAIN_TEXT_TYPE), Some("p\n\tc\n"));

    editor.set_selection(4..4);
    editor.paste(&pasteboard).unwrap();
    assert_eq!(editor.model().to_outline_text(), "p\n\tc\nq\np\n\tc\n");
    assert_eq!(editor.storage().text(), "p\nc\nq\np\nc\n");
}

#[test]
fn test_newer_payload_version_is_refused() {
    let mut pasteboard = Pasteboard::new();
    pasteboard.set(ITEM_REFERENCE_TYPE, r#"{"version":99,"items":[]}"#);
    pasteboard.set(PLAIN_TEXT_TYPE, "fallback\n");
    assert!(pasteboard.read().is_err());

    pasteboard.set(ITEM_REFERENCE_TYPE, "not json");
    assert_eq!(
        pasteboard.read().unwrap(),
        Some(PasteboardContent::Text("fallback\n".to_string()))
    );
}
