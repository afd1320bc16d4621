use outline_core::{
    DocumentModel, EditorContext, EditorSettings, LayoutEngine, MemoryOutline,
    OutlineTextStorage, Point, StyleSheet,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

const WORDS: &[&str] = &["alpha", "be", "gamma", "- task", "@tag", "delta", "你好", "x"];

fn random_outline(rng: &mut StdRng, lines: usize) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    for _ in 0..lines {
        depth = rng.gen_range(0..=depth + 1).min(9);
        let words = rng.gen_range(1..30);
        let body: Vec<&str> = (0..words)
            .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
            .collect();
        out.push_str(&"\t".repeat(depth));
        out.push_str(&body.join(" "));
        out.push('\n');
    }
    out
}

fn setup(text: &str) -> (OutlineTextStorage<MemoryOutline>, EditorContext) {
    let storage = OutlineTextStorage::new(MemoryOutline::from_outline_text(text)).unwrap();
    let context = EditorContext::new(Rc::new(StyleSheet::standard()), EditorSettings::default());
    (storage, context)
}

#[test]
fn test_deeper_items_start_further_right() {
    let mut rng = StdRng::seed_from_u64(7);
    for width in [1000.0, 300.0] {
        let (storage, context) = setup(&random_outline(&mut rng, 60));
        let mut engine = LayoutEngine::new(width);
        let layout = engine.layout(&storage, &context);

        let items: Vec<(usize, f32)> = layout
            .paragraphs()
            .iter()
            .map(|p| (p.indent_level, p.geometry.item_rect.min_x()))
            .collect();
        for &(depth_a, x_a) in &items {
            for &(depth_b, x_b) in &items {
                if depth_a < depth_b {
                    if width >= 1000.0 {
                        assert!(x_a < x_b, "depth {depth_a} at {x_a}, depth {depth_b} at {x_b}");
                    } else {
                        assert!(x_a <= x_b, "depth {depth_a} at {x_a}, depth {depth_b} at {x_b}");
                    }
                } else if depth_a == depth_b {
                    assert_eq!(x_a, x_b);
                }
            }
        }
    }
}

#[test]
fn test_paragraphs_stack_top_to_bottom() {
    let mut rng = StdRng::seed_from_u64(11);
    let (storage, context) = setup(&random_outline(&mut rng, 80));
    let mut engine = LayoutEngine::new(420.0);
    let layout = engine.layout(&storage, &context);

    let paragraphs = layout.paragraphs();
    assert_eq!(paragraphs.len(), storage.paragraph_count());
    for pair in paragraphs.windows(2) {
        let (above, below) = (&pair[0].geometry, &pair[1].geometry);
        assert!(above.item_rect.min_y() < below.item_rect.min_y());
        assert!(above.item_rect.max_y() <= below.item_rect.min_y() + 0.001);
        assert_eq!(pair[0].char_range.end, pair[1].char_range.start);
    }
    let last = paragraphs.last().unwrap();
    assert_eq!(
        last.fragments.last().unwrap().rect.max_y(),
        layout.document_height()
    );

    for paragraph in paragraphs {
        let fragments = &paragraph.fragments;
        assert!(!fragments.is_empty());
        assert_eq!(fragments[0].char_range.start, paragraph.char_range.start);
        assert_eq!(
            fragments.last().unwrap().char_range.end,
            paragraph.char_range.end
        );
        for pair in fragments.windows(2) {
            assert_eq!(pair[0].char_range.end, pair[1].char_range.start);
            assert!(pair[0].rect.max_y() <= pair[1].rect.min_y() + 0.001);
        }
    }
}

#[test]
fn test_showing_invisibles_does_not_move_anything() {
    let (storage, context) = setup("Inbox:\n\t- milk and eggs\n\t\tnote\twith tab\nWork:\n");
    let mut engine = LayoutEngine::new(360.0);

    let hidden = engine.layout(&storage, &context).clone();
    assert!(hidden.invisible_glyphs(0..storage.len()).is_empty());

    context.update_settings(|s| s.show_invisibles = true);
    let shown = engine.layout(&storage, &context).clone();
    assert_eq!(engine.passes_computed(), 2);
    assert!(!shown.invisible_glyphs(0..storage.len()).is_empty());

    for (a, b) in hidden.paragraphs().iter().zip(shown.paragraphs()) {
        assert_eq!(a.geometry, b.geometry);
        assert_eq!(a.fragments, b.fragments);
    }
    assert_eq!(hidden.document_height(), shown.document_height());
}

#[test]
fn test_points_map_back_into_their_paragraph() {
    let mut rng = StdRng::seed_from_u64(3);
    let (storage, context) = setup(&random_outline(&mut rng, 40));
    let mut engine = LayoutEngine::new(500.0);
    let layout = engine.layout(&storage, &context);

    for paragraph in layout.paragraphs() {
        let rect = paragraph.geometry.item_rect;
        let point = Point::new(rect.min_x() + 1.0, rect.mid_y());
        assert_eq!(layout.paragraph_index_at_y(point.y), paragraph.index);
        let index = layout.char_index_at_point(point);
        assert!(paragraph.char_range.contains(&index));
    }
}

#[test]
fn test_structural_edit_relayouts_once() {
    let (mut storage, context) = setup("a\nb\n");
    let mut engine = LayoutEngine::new(400.0);
    engine.layout(&storage, &context);
    engine.layout(&storage, &context);
    assert_eq!(engine.passes_computed(), 1);

    let (a, b) = (
        storage.model().find("a").unwrap(),
        storage.model().find("b").unwrap(),
    );
    storage
        .perform_model_edit(|m| m.move_branches(&[b], a, None))
        .unwrap();
    let layout = engine.layout(&storage, &context);
    assert_eq!(layout.paragraphs()[1].indent_level, 2);
    assert!(
        layout.paragraphs()[1].geometry.item_rect.min_x()
            > layout.paragraphs()[0].geometry.item_rect.min_x()
    );
    assert_eq!(engine.passes_computed(), 2);
}
