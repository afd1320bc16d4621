use outline_core::{DocumentModel, MemoryOutline, OutlineTextStorage, StorageChange};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

fn storage(text: &str) -> OutlineTextStorage<MemoryOutline> {
    OutlineTextStorage::new(MemoryOutline::from_outline_text(text)).unwrap()
}

fn assert_consistent(storage: &OutlineTextStorage<MemoryOutline>) {
    assert_eq!(storage.text(), storage.model().displayed_text());
    assert!(storage.paragraphs().is_verified());
    assert_eq!(
        storage.node_ids_in_range(0..storage.len()),
        storage.model().node_ids_in_range(0..storage.len())
    );
}

#[test]
fn test_editing_one_paragraph_evicts_only_its_node() {
    let mut storage = storage("one\ntwo\nthree @tag\n");
    let model = storage.model();
    let (one, two, three) = (
        model.find("one").unwrap(),
        model.find("two").unwrap(),
        model.find("three @tag").unwrap(),
    );

    let warm = storage.metadata_in_range(0..storage.len());
    assert_eq!(warm.len(), 3);
    let one_before = storage.metadata_for_node(one).unwrap();
    let three_before = storage.metadata_for_node(three).unwrap();
    assert_eq!(three_before.run_spans().len(), 2);

    let changes: Rc<RefCell<Vec<StorageChange>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    storage.subscribe(move |change| sink.borrow_mut().push(change.clone()));

    storage.replace_range(4..7, "TWO").unwrap();

    let changes = changes.borrow();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].evicted, vec![two]);
    assert_eq!(changes[0].edited_range, 4..7);
    assert_eq!(changes[0].change_in_length, 0);

    let cache = storage.metadata_cache();
    assert!(cache.contains(one));
    assert!(!cache.contains(two));
    assert!(cache.contains(three));
    drop(cache);

    assert!(Rc::ptr_eq(&one_before, &storage.metadata_for_node(one).unwrap()));
    assert!(Rc::ptr_eq(&three_before, &storage.metadata_for_node(three).unwrap()));
    assert_eq!(storage.model().body(two).as_deref(), Some("TWO"));
}

#[test]
fn test_cache_miss_fetches_a_batch() {
    let text: String = (0..100).map(|i| format!("line {i}\n")).collect();
    let mut storage = storage(&text);
    storage.set_metadata_batch_size(10);

    storage.metadata_at(0);
    assert_eq!(storage.metadata_cache().fetch_count(), 1);
    assert_eq!(storage.metadata_cache().len(), 10);

    for i in 0..10 {
        let location = storage.paragraph_range(i).start;
        storage.metadata_at(location);
    }
    assert_eq!(storage.metadata_cache().fetch_count(), 1);
}

#[test]
fn test_structure_change_evicts_without_text_change() {
    let mut storage = storage("- a\n- b\n");
    let a = storage.model().find("- a").unwrap();
    let before = storage.metadata_for_node(a).unwrap();
    let version = storage.version();

    storage
        .perform_model_edit(|m| m.set_attribute(a, "done", Some("")))
        .unwrap();

    assert_eq!(storage.text(), "- a\n- b\n");
    assert!(storage.version() > version);
    let after = storage.metadata_for_node(a).unwrap();
    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(after.style_key_path, "item.task.done");
}

#[test]
fn test_random_edits_keep_buffer_and_tree_in_lockstep() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let pieces = ["x", "\n", "", "ab\ncd", "\t", "- ", "Done:", "\r\n", "你好"];
    let mut storage = storage("Inbox:\n\t- milk\n\t- eggs @today\nWork:\n\tnote\n");

    for _ in 0..300 {
        let len = storage.len();
        let a = rng.gen_range(0..=len);
        let b = rng.gen_range(0..=len);
        let range = a.min(b)..a.max(b);
        let text = pieces[rng.gen_range(0..pieces.len())];
        storage.replace_range(range, text).unwrap();
        assert_consistent(&storage);
        assert!(storage.text().ends_with('\n'));
    }
}

#[test]
fn test_random_in_paragraph_edits_preserve_other_entries() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut storage = storage("alpha\nbeta\n\tgamma\ndelta\nepsilon\n");

    for _ in 0..100 {
        let entries = storage.metadata_in_range(0..storage.len());
        let index = rng.gen_range(0..storage.paragraph_count());
        let body = storage.body_range(index);
        let a = rng.gen_range(body.start..=body.end);
        let b = rng.gen_range(a..=body.end);
        let edited = storage.node_at(body.start).unwrap();
        let letter = (b'a' + rng.gen_range(0..26u8)) as char;

        storage.replace_range(a..b, &letter.to_string()).unwrap();
        assert_consistent(&storage);

        for entry in entries {
            let cached = storage.metadata_cache().get(entry.id);
            if entry.id == edited {
                assert!(cached.is_none());
            } else {
                assert!(cached.is_some_and(|c| Rc::ptr_eq(&c, &entry)));
            }
        }
    }
}
