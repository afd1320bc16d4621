use outline_core::{
    DocumentModel, EditOrigin, MemoryOutline, NodeId, NodeKind, NodeMetadata, OutlineTextStorage,
    Result, SerializedNode, StorageChange, SyncState, TreeChange,
};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::ops::Range;
use std::rc::Rc;

fn storage(text: &str) -> OutlineTextStorage<MemoryOutline> {
    OutlineTextStorage::new(MemoryOutline::from_outline_text(text)).unwrap()
}

fn record_changes(
    storage: &mut OutlineTextStorage<MemoryOutline>,
) -> Rc<RefCell<Vec<StorageChange>>> {
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    storage.subscribe(move |change| sink.borrow_mut().push(change.clone()));
    changes
}

#[test]
fn test_model_edits_are_never_echoed() {
    let mut storage = storage("Inbox:\n\t- milk\nWork:\n");
    let inbox = storage.model().find("Inbox:").unwrap();
    let work = storage.model().find("Work:").unwrap();

    storage
        .perform_model_edit(|m| {
            m.set_body(inbox, "Home:")?;
            let id = m.create_node(NodeKind::Task, "- call");
            m.insert_children(work, &[id], None)
        })
        .unwrap();
    storage.sync_from_model().unwrap();

    assert_eq!(storage.text(), "Home:\n- milk\nWork:\n- call\n");
    assert_eq!(storage.model().replace_range_calls(), 0);
    assert_eq!(storage.sync_state(), SyncState::Idle);
    assert!(storage.paragraphs().is_verified());
}

#[test]
fn test_view_edit_reaches_model_exactly_once() {
    let mut storage = storage("one\ntwo\n");
    let changes = record_changes(&mut storage);

    storage.replace_range(3..3, "\nthree").unwrap();

    assert_eq!(storage.model().replace_range_calls(), 1);
    assert_eq!(storage.model().displayed_text(), "one\nthree\ntwo\n");
    let changes = changes.borrow();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].origin, EditOrigin::View);
    assert_eq!(changes[0].change_in_length, 6);
}

#[test]
fn test_nested_brackets_queue_until_outermost_closes() {
    let mut storage = storage("a\nb\nc\n");
    let changes = record_changes(&mut storage);
    let a = storage.model().find("a").unwrap();
    let c = storage.model().find("c").unwrap();

    storage.begin_edit();
    storage
        .perform_model_edit(|m| m.set_body(a, "alpha"))
        .unwrap();
    assert!(storage.pending_tree_edits() > 0);
    assert_eq!(storage.text(), "a\nb\nc\n");

    storage.begin_edit();
    storage
        .perform_model_edit(|m| m.set_body(c, "gamma"))
        .unwrap();
    storage.end_edit().unwrap();
    assert!(changes.borrow().is_empty());

    storage.end_edit().unwrap();

    assert_eq!(storage.pending_tree_edits(), 0);
    assert_eq!(storage.text(), "alpha\nb\ngamma\n");
    let changes = changes.borrow();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].origin, EditOrigin::Model);
    assert_eq!(changes[0].edited_range, 0..14);
    assert_eq!(changes[0].change_in_length, 8);
}

#[test]
fn test_view_edit_flushes_queued_model_edits_first() {
    let mut storage = storage("a\nb\n");
    let b = storage.model().find("b").unwrap();

    storage.begin_edit();
    storage.perform_model_edit(|m| m.set_body(b, "bee")).unwrap();
    storage.replace_range(0..1, "A").unwrap();
    storage.end_edit().unwrap();

    assert_eq!(storage.text(), "A\nbee\n");
    assert_eq!(storage.model().displayed_text(), "A\nbee\n");
    assert!(storage.paragraphs().is_verified());
}

#[test]
fn test_outermost_bracket_is_one_undo_group() {
    let mut storage = storage("one\ntwo\n");
    let one = storage.model().find("one").unwrap();
    let two = storage.model().find("two").unwrap();

    storage.begin_edit();
    storage.perform_model_edit(|m| m.set_body(one, "1")).unwrap();
    storage.replace_range(2..5, "2").unwrap();
    storage.perform_model_edit(|m| m.move_branches(&[two], one, None)).unwrap();
    storage.end_edit().unwrap();
    assert_eq!(storage.model().undo_group_count(), 1);
    assert_eq!(storage.model().to_outline_text(), "1\n\t2\n");

    let mut model = storage.into_model();
    assert!(model.undo());
    assert_eq!(model.to_outline_text(), "one\ntwo\n");
    assert_eq!(model.undo_group_count(), 0);
}

#[test]
fn test_empty_bracket_notifies_nobody() {
    let mut storage = storage("one\n");
    let changes = record_changes(&mut storage);
    storage.begin_edit();
    storage.end_edit().unwrap();
    storage.sync_from_model().unwrap();
    assert!(changes.borrow().is_empty());
    assert_eq!(storage.model().undo_group_count(), 0);
}

#[test]
fn test_collapse_removes_descendant_paragraphs() {
    let mut storage = storage("p\n\tc1\n\t\tg\n\tc2\nq\n");
    let p = storage.model().find("p").unwrap();

    storage
        .perform_model_edit(|m| m.set_expanded(p, false))
        .unwrap();
    assert_eq!(storage.text(), "p\nq\n");
    assert_eq!(storage.paragraph_count(), 2);

    storage
        .perform_model_edit(|m| m.set_expanded(p, true))
        .unwrap();
    assert_eq!(storage.text(), "p\nc1\ng\nc2\nq\n");
    assert_eq!(
        storage.node_ids_in_range(0..storage.len()),
        storage.model().node_ids_in_range(0..storage.len())
    );
}

#[test]
fn test_line_separator_stays_inside_a_body() {
    let mut storage = storage("a\u{2028}b\nc\n");
    assert_eq!(storage.paragraph_count(), 2);

    storage.replace_range(5..5, "\u{2028}d\u{85}e").unwrap();
    assert_eq!(storage.text(), "a\u{2028}b\nc\u{2028}d\u{85}e\n");
    assert_eq!(storage.paragraph_count(), 2);
    assert_eq!(storage.model().displayed_text(), storage.text());
    assert!(storage.paragraphs().is_verified());

    let c = storage.model().find("c\u{2028}d\u{85}e").unwrap();
    assert_eq!(storage.node_ids_in_range(4..storage.len()), vec![c]);
    assert_eq!(
        storage.model().to_outline_text(),
        "a\u{2028}b\nc\u{2028}d\u{85}e\n"
    );
}

/// Answers the first id query after a buffer edit with one node missing.
struct ShortAnswerOutline {
    inner: MemoryOutline,
    short_answer: Cell<bool>,
}

impl DocumentModel for ShortAnswerOutline {
    fn root(&self) -> NodeId {
        self.inner.root()
    }
    fn create_node(&mut self, kind: NodeKind, body: &str) -> NodeId {
        self.inner.create_node(kind, body)
    }
    fn clone_nodes(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        self.inner.clone_nodes(ids)
    }
    fn set_body(&mut self, id: NodeId, body: &str) -> Result<()> {
        self.inner.set_body(id, body)
    }
    fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> Result<()> {
        self.inner.set_attribute(id, name, value)
    }
    fn insert_children(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
        next_sibling: Option<NodeId>,
    ) -> Result<()> {
        self.inner.insert_children(parent, children, next_sibling)
    }
    fn remove_from_parent(&mut self, id: NodeId) -> Result<()> {
        self.inner.remove_from_parent(id)
    }
    fn move_branches(
        &mut self,
        ids: &[NodeId],
        parent: NodeId,
        next_sibling: Option<NodeId>,
    ) -> Result<()> {
        self.inner.move_branches(ids, parent, next_sibling)
    }
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.parent(id)
    }
    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.children(id)
    }
    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.inner.next_sibling(id)
    }
    fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.inner.previous_sibling(id)
    }
    fn can_have_children(&self, id: NodeId) -> bool {
        self.inner.can_have_children(id)
    }
    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.inner.kind(id)
    }
    fn body(&self, id: NodeId) -> Option<String> {
        self.inner.body(id)
    }
    fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.inner.attribute(id, name)
    }
    fn is_expanded(&self, id: NodeId) -> bool {
        self.inner.is_expanded(id)
    }
    fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<()> {
        self.inner.set_expanded(id, expanded)
    }
    fn begin_undo_grouping(&mut self) {
        self.inner.begin_undo_grouping()
    }
    fn end_undo_grouping(&mut self) {
        self.inner.end_undo_grouping()
    }
    fn displayed_text(&self) -> String {
        self.inner.displayed_text()
    }
    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        self.inner.replace_range(range, text)?;
        self.short_answer.set(true);
        Ok(())
    }
    fn node_ids_in_range(&self, range: Range<usize>) -> Vec<NodeId> {
        let mut ids = self.inner.node_ids_in_range(range);
        if self.short_answer.replace(false) {
            ids.pop();
        }
        ids
    }
    fn metadata_for_nodes(&self, ids: &[NodeId]) -> Vec<NodeMetadata> {
        self.inner.metadata_for_nodes(ids)
    }
    fn guide_ranges(&self, range: Range<usize>) -> Vec<Range<usize>> {
        self.inner.guide_ranges(range)
    }
    fn take_changes(&mut self) -> Vec<TreeChange> {
        self.inner.take_changes()
    }
    fn serialize_branches(&self, ids: &[NodeId]) -> Result<Vec<SerializedNode>> {
        self.inner.serialize_branches(ids)
    }
    fn deserialize_branches(&mut self, nodes: &[SerializedNode]) -> Result<Vec<NodeId>> {
        self.inner.deserialize_branches(nodes)
    }
}

#[test]
fn test_disagreeing_model_after_view_edit_is_resynchronized() {
    let model = ShortAnswerOutline {
        inner: MemoryOutline::from_outline_text("one\ntwo\n"),
        short_answer: Cell::new(false),
    };
    let mut storage = OutlineTextStorage::new(model).unwrap();
    let version = storage.version();

    storage.replace_range(3..3, "\nthree").unwrap();

    assert_eq!(storage.text(), "one\nthree\ntwo\n");
    assert_eq!(storage.model().displayed_text(), storage.text());
    assert!(storage.paragraphs().is_verified());
    assert_eq!(
        storage.node_ids_in_range(0..storage.len()),
        storage.model().inner.node_ids_in_range(0..storage.len())
    );
    assert_eq!(storage.sync_state(), SyncState::Idle);
    assert!(!storage.is_editing());
    assert!(storage.version() > version);
}
