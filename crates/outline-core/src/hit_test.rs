//! Point → item resolution against a layout pass.

use crate::geometry::Point;
use crate::layout::{Layout, ParagraphLayout};
use crate::metadata::LinkTarget;
use crate::model::NodeId;

/// What lies under a point.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPick {
    /// Node of the paragraph under the point (`None` only for an unresolved paragraph).
    pub node: Option<NodeId>,
    /// Paragraph index.
    pub paragraph: usize,
    /// Nearest caret position.
    pub character_index: usize,
    /// The point is inside the folding handle.
    pub handle_contains_point: bool,
    /// The point is inside the item body.
    pub item_contains_point: bool,
    /// Link run under the point.
    pub link: Option<LinkTarget>,
    /// The picked point.
    pub point: Point,
}

impl ItemPick {
    /// `true` if the point landed on the item's row but outside both handle and body.
    pub fn is_margin(&self) -> bool {
        !self.handle_contains_point && !self.item_contains_point
    }
}

impl Layout {
    /// Resolve `point` to the paragraph whose vertical extent contains it (clamped to the
    /// first/last paragraph).
    ///
    /// Handle membership is only tested when the paragraph's style declares a handle;
    /// otherwise every point on the row is a body point.
    pub fn pick(&self, point: Point) -> Option<ItemPick> {
        let index = self.paragraph_index_at_y(point.y);
        let paragraph = self.paragraph_geometry(index)?;
        let geometry = paragraph.geometry;

        let (handle_contains_point, item_contains_point) = if paragraph.style.has_handle() {
            (
                geometry.handle_rect.contains(point),
                geometry.item_rect.contains(point),
            )
        } else {
            let on_row =
                point.y >= geometry.item_rect.min_y() && point.y < geometry.item_rect.max_y();
            (false, on_row)
        };

        let mut pick = ItemPick {
            node: paragraph.node,
            paragraph: index,
            character_index: self.char_index_at_point(point),
            handle_contains_point,
            item_contains_point,
            link: None,
            point,
        };
        if item_contains_point {
            pick.link = self.link_at(&pick);
        }
        Some(pick)
    }

    /// The link run whose glyph rects contain the picked point.
    pub fn link_at(&self, pick: &ItemPick) -> Option<LinkTarget> {
        let paragraph = self.paragraph_geometry(pick.paragraph)?;
        link_in_paragraph(self, paragraph, pick.point)
    }
}

fn link_in_paragraph(
    layout: &Layout,
    paragraph: &ParagraphLayout,
    point: Point,
) -> Option<LinkTarget> {
    let metadata = paragraph.metadata.as_ref()?;
    let start = paragraph.char_range.start;
    metadata.run_spans().into_iter().find_map(|span| {
        let link = span.link?;
        let range = start + span.range.start..start + span.range.end;
        layout
            .rects_for_range(range)
            .iter()
            .any(|rect| rect.contains(point))
            .then_some(link)
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::context::EditorContext;
    use crate::layout::LayoutEngine;
    use crate::memory::MemoryOutline;
    use crate::settings::EditorSettings;
    use crate::style::{ComputedStyle, StyleSheet};
    use crate::text_storage::OutlineTextStorage;

    fn pick_in(text: &str, sheet: StyleSheet, point: Point) -> (ItemPick, MemoryOutline) {
        let storage = OutlineTextStorage::new(MemoryOutline::from_outline_text(text)).unwrap();
        let context = EditorContext::new(Rc::new(sheet), EditorSettings::default());
        let mut engine = LayoutEngine::new(400.0);
        let pick = engine.layout(&storage, &context).pick(point).unwrap();
        (pick, storage.into_model())
    }

    #[test]
    fn test_pick_handle_and_body() {
        let (pick, model) = pick_in("one\ntwo\n", StyleSheet::standard(), Point::new(5.0, 20.0));
        assert_eq!(pick.node, model.find("two"));
        assert_eq!(pick.paragraph, 1);
        assert!(pick.handle_contains_point);
        assert!(!pick.item_contains_point);

        let (pick, _) = pick_in("one\ntwo\n", StyleSheet::standard(), Point::new(30.0, 20.0));
        assert!(pick.item_contains_point);
        assert_eq!(pick.character_index, 5);
    }

    #[test]
    fn test_rows_without_handles_are_all_body() {
        let sheet = StyleSheet::new();
        sheet.set_style("item", ComputedStyle::default());
        let (pick, _) = pick_in("one\n", sheet, Point::new(5.0, 5.0));
        assert!(!pick.handle_contains_point);
        assert!(pick.item_contains_point);
    }

    #[test]
    fn test_pick_below_last_paragraph_clamps() {
        let (pick, model) = pick_in("one\ntwo\n", StyleSheet::standard(), Point::new(30.0, 500.0));
        assert_eq!(pick.node, model.find("two"));
    }

    #[test]
    fn test_link_under_point() {
        // "- call @home": marker at cells 0..2, tag at cells 7..12, text starts at x = 20.
        let text = "- call @home\n";
        let (pick, _) = pick_in(text, StyleSheet::standard(), Point::new(20.0 + 8.0 * 8.0, 9.0));
        assert!(matches!(pick.link, Some(LinkTarget::Filter(ref l)) if l == "filter://@home"));

        let (pick, _) = pick_in(text, StyleSheet::standard(), Point::new(22.0, 9.0));
        assert!(matches!(pick.link, Some(LinkTarget::ToggleDone(_))));

        let (pick, _) = pick_in(text, StyleSheet::standard(), Point::new(20.0 + 8.0 * 4.0, 9.0));
        assert_eq!(pick.link, None);
    }
}
