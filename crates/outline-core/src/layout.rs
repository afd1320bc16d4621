//! Headless layout of the outline buffer.
//!
//! Turns paragraphs into line fragments and per-item geometry. Indentation, wrap width
//! and hanging indents come from tree depth and computed styles; text is measured with
//! UAX #11 cell widths times the font's cell advance, so the layout is deterministic and
//! needs no font rasterizer.
//!
//! Every paragraph reserves room for a trailing invisible glyph whether or not invisibles
//! are shown, so toggling them never reflows.

use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use unicode_width::UnicodeWidthChar;

use crate::context::EditorContext;
use crate::geometry::{Point, Rect, Size};
use crate::metadata::NodeMetadata;
use crate::model::{DocumentModel, NodeId, NodeKind};
use crate::style::{ComputedStyle, FontMetrics};
use crate::text_storage::OutlineTextStorage;

/// Default tab width (in cells).
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Extra space after a trailing invisible glyph.
pub const INVISIBLE_SPACING: f32 = 1.5;

/// Glyph shown for a space.
pub const SPACE_INVISIBLE: char = '·';
/// Glyph shown for a tab.
pub const TAB_INVISIBLE: char = '→';
/// Glyph shown for a line separator (U+2028).
pub const LINE_SEPARATOR_INVISIBLE: char = '↵';
/// Glyph shown for a paragraph terminator.
pub const NEWLINE_INVISIBLE: char = '¶';

const INVISIBLE_GLYPHS: [char; 4] = [
    NEWLINE_INVISIBLE,
    LINE_SEPARATOR_INVISIBLE,
    TAB_INVISIBLE,
    SPACE_INVISIBLE,
];

/// Calculate visual width of a character (based on UAX #11)
///
/// Return value:
/// - 1: Narrow character (ASCII, etc.)
/// - 2: Wide character (CJK, fullwidth, etc.)
/// - 0: Zero-width character (combining characters, etc.)
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Calculate visual width (in cells) for a character at a specific cell offset within the line.
///
/// For `'\t'`, width advances to the next tab stop based on `tab_width`.
pub fn cell_width_at(ch: char, cell_offset_in_line: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        tab_width - cell_offset_in_line % tab_width
    } else {
        char_width(ch)
    }
}

/// Room reserved at the end of every line for the widest invisible glyph.
pub fn invisible_reserve(font: &FontMetrics) -> f32 {
    let widest = INVISIBLE_GLYPHS.iter().map(|&c| char_width(c)).max().unwrap_or(1);
    widest as f32 * font.cell_advance + INVISIBLE_SPACING
}

/// Wrap point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPoint {
    /// Character index where wrapping occurs (within the paragraph body)
    pub char_index: usize,
    /// Byte offset where wrapping occurs (within the paragraph body)
    pub byte_offset: usize,
}

/// Word-wrap `text` to `width_cells`, preferring whitespace and falling back to character
/// breaks. Continuation lines start `hang_cells` in. Wide characters never split.
pub fn wrap_points(
    text: &str,
    width_cells: usize,
    hang_cells: usize,
    tab_width: usize,
) -> Vec<WrapPoint> {
    if width_cells == 0 {
        return Vec::new();
    }
    let hang_cells = hang_cells.min(width_cells.saturating_sub(1));

    let mut wrap_points = Vec::new();
    let mut segment_start_char = 0usize;
    let mut segment_start_x = 0usize;
    let mut last_break: Option<(usize, usize, usize)> = None; // (char_index, byte_offset, x)
    let mut x_in_line = 0usize;

    for (char_index, (byte_offset, ch)) in text.char_indices().enumerate() {
        let ch_width = cell_width_at(ch, x_in_line, tab_width);

        loop {
            let indent = if segment_start_char == 0 { 0 } else { hang_cells };
            let x_in_segment = x_in_line.saturating_sub(segment_start_x) + indent;
            if x_in_segment + ch_width <= width_cells || ch.is_whitespace() {
                break;
            }

            if let Some((break_char, break_byte, break_x)) = last_break
                && break_char > segment_start_char
            {
                wrap_points.push(WrapPoint {
                    char_index: break_char,
                    byte_offset: break_byte,
                });
                segment_start_char = break_char;
                segment_start_x = break_x;
                last_break = None;
                continue;
            }

            if char_index > segment_start_char {
                wrap_points.push(WrapPoint {
                    char_index,
                    byte_offset,
                });
                segment_start_char = char_index;
                segment_start_x = x_in_line;
                last_break = None;
            }
            break;
        }

        x_in_line += ch_width;
        if ch.is_whitespace() {
            last_break = Some((char_index + 1, byte_offset + ch.len_utf8(), x_in_line));
        }
    }

    wrap_points
}

/// One laid-out visual line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFragment {
    /// Paragraph index.
    pub paragraph: usize,
    /// Buffer characters on this line; the last line of a paragraph includes its
    /// terminator.
    pub char_range: Range<usize>,
    /// Full line rect: padding, spacing and reserved trailing room included.
    pub rect: Rect,
    /// Rect actually covered by glyphs plus padding.
    pub used_rect: Rect,
    /// X of the first glyph.
    pub text_origin_x: f32,
    text: String,
    start_cell: usize,
}

impl LineFragment {
    /// Visible text of the line (terminator excluded).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Left edge and width of every glyph on the line, in order.
    fn glyph_spans(&self, advance: f32, tab_width: usize) -> Vec<(f32, f32)> {
        let mut x = self.text_origin_x;
        let mut cell = self.start_cell;
        self.text
            .chars()
            .map(|ch| {
                let w = cell_width_at(ch, cell, tab_width);
                cell += w;
                let span = (x, w as f32 * advance);
                x += span.1;
                span
            })
            .collect()
    }
}

/// Geometry of one item (paragraph).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemGeometry {
    /// Union of the item's line fragments, inset by the line fragment padding.
    pub item_rect: Rect,
    /// Union of the used rects.
    pub item_used_rect: Rect,
    /// Strip left of the first line that holds the folding handle.
    pub handle_rect: Rect,
}

/// Layout of one paragraph.
#[derive(Debug, Clone)]
pub struct ParagraphLayout {
    /// Paragraph index.
    pub index: usize,
    /// Node rendered by the paragraph.
    pub node: Option<NodeId>,
    /// Characters including the terminator.
    pub char_range: Range<usize>,
    /// Depth used for indentation.
    pub indent_level: usize,
    /// Node type.
    pub kind: NodeKind,
    /// Style of the paragraph.
    pub style: Rc<ComputedStyle>,
    /// Cached metadata the paragraph was laid out with.
    pub metadata: Option<Rc<NodeMetadata>>,
    /// Visual lines, top to bottom.
    pub fragments: Vec<LineFragment>,
    /// Item geometry.
    pub geometry: ItemGeometry,
}

/// A vertical connector from a handle to the end of its branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideLine {
    /// Ancestor that owns the guide.
    pub node: NodeId,
    /// Line rect.
    pub rect: Rect,
}

/// Seam between two consecutive paragraphs inside a selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionGap {
    /// Upper paragraph index.
    pub paragraph: usize,
    /// Segment along the bottom edge of the upper item (may have zero height).
    pub rect: Rect,
    /// The terminator between the two paragraphs is selected.
    pub selected: bool,
}

/// A folding handle bullet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleMark {
    /// Node.
    pub node: NodeId,
    /// Bullet rect, centered in the handle rect.
    pub rect: Rect,
    /// The node has children that are hidden.
    pub collapsed: bool,
}

/// Placement of an invisible glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvisibleGlyph {
    /// Buffer character the glyph stands for.
    pub character_index: usize,
    /// Glyph to draw.
    pub glyph: char,
    /// Where to draw it.
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayoutKey {
    version: u64,
    generation: (u64, u64),
    width_bits: u32,
}

/// One complete layout pass.
#[derive(Debug, Clone)]
pub struct Layout {
    key: LayoutKey,
    paragraphs: Vec<ParagraphLayout>,
    by_node: HashMap<NodeId, usize>,
    height: f32,
    tab_width: usize,
    show_invisibles: bool,
    draw_guides: bool,
    guide_line_width: f32,
}

impl Layout {
    fn compute<M: DocumentModel>(
        storage: &OutlineTextStorage<M>,
        context: &EditorContext,
        width: f32,
        tab_width: usize,
        key: LayoutKey,
    ) -> Self {
        let settings = context.settings().clone();
        let editor_style = context.editor_style();
        let per_level = editor_style
            .item_indent
            .unwrap_or(settings.item_indent_per_level);
        let padding = per_level / 2.0;
        let editor_wrap = settings
            .editor_wrap_to_column
            .or(editor_style.editor_wrap_to_column);

        let metadata: HashMap<NodeId, Rc<NodeMetadata>> = storage
            .metadata_in_range(0..storage.len())
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let table = storage.paragraphs();

        let mut paragraphs = Vec::with_capacity(table.paragraph_count());
        let mut by_node = HashMap::new();
        let mut y = 0.0f32;

        for index in 0..table.paragraph_count() {
            let node = table.id(index);
            let meta = node.and_then(|id| metadata.get(&id)).cloned();
            let indent_level = meta.as_ref().map_or(0, |m| m.indent_level);
            let kind = meta.as_ref().map_or(NodeKind::Note, |m| m.kind);
            let style = match &meta {
                Some(m) => context.style(&m.style_key_path),
                None => context.style("item"),
            };
            let font = style.font;
            let advance = font.cell_advance.max(f32::EPSILON);
            let reserved = invisible_reserve(&font);

            let mut indent_x = indent_level as f32 * per_level;
            let mut available = width - indent_x - reserved;
            if available < settings.min_item_wrap_width {
                available = settings.min_item_wrap_width;
                indent_x = (width - reserved - available).max(0.0).min(indent_x);
            }
            let mut wrap_width = available;
            if let Some(columns) = editor_wrap {
                wrap_width = wrap_width.min(columns as f32 * advance);
            }
            if kind == NodeKind::Task
                && let Some(columns) = style.item_wrap_to_column
            {
                wrap_width = wrap_width.min(columns as f32 * advance);
            }

            let body = table.body_text(index);
            let hang_cells = if kind == NodeKind::Task {
                let mut cell = 0;
                for ch in body.chars().take(2) {
                    cell += cell_width_at(ch, cell, tab_width);
                }
                cell
            } else {
                0
            };
            let width_cells = ((wrap_width / advance).floor() as usize).max(1);
            let breaks = wrap_points(&body, width_cells, hang_cells, tab_width);

            let char_range = table.paragraph_range(index);
            let body_chars: Vec<char> = body.chars().collect();
            let mut bounds: Vec<usize> = Vec::with_capacity(breaks.len() + 2);
            bounds.push(0);
            bounds.extend(breaks.iter().map(|wp| wp.char_index));
            bounds.push(body_chars.len());

            let segments = bounds.len() - 1;
            let mut fragments = Vec::with_capacity(segments);
            let mut cell = 0usize;
            for (k, window) in bounds.windows(2).enumerate() {
                let (from, to) = (window[0], window[1]);
                let first = k == 0;
                let last = k + 1 == segments;
                let before = if first && index > 0 {
                    style.paragraph_spacing_before
                } else {
                    0.0
                };
                let after = if last { style.paragraph_spacing_after } else { 0.0 };
                let shift = if first { 0.0 } else { hang_cells as f32 * advance };

                let start_cell = cell;
                let text: String = body_chars[from..to].iter().collect();
                for &ch in &body_chars[from..to] {
                    cell += cell_width_at(ch, cell, tab_width);
                }
                let glyph_width = (cell - start_cell) as f32 * advance;

                let frag_x = indent_x - padding;
                let end = if last {
                    char_range.end
                } else {
                    char_range.start + to
                };
                fragments.push(LineFragment {
                    paragraph: index,
                    char_range: char_range.start + from..end,
                    rect: Rect::new(
                        frag_x,
                        y,
                        wrap_width + 2.0 * padding + reserved,
                        font.line_height + before + after,
                    ),
                    used_rect: Rect::new(
                        frag_x + shift,
                        y + before,
                        glyph_width + 2.0 * padding,
                        font.line_height,
                    ),
                    text_origin_x: indent_x + shift,
                    text,
                    start_cell,
                });
                y += font.line_height + before + after;
            }

            let geometry = item_geometry(&fragments, per_level, padding);
            if let Some(id) = node {
                by_node.insert(id, index);
            }
            paragraphs.push(ParagraphLayout {
                index,
                node,
                char_range,
                indent_level,
                kind,
                style,
                metadata: meta,
                fragments,
                geometry,
            });
        }

        tracing::trace!(paragraphs = paragraphs.len(), height = y, width, "layout pass");
        Self {
            key,
            paragraphs,
            by_node,
            height: y,
            tab_width,
            show_invisibles: settings.show_invisibles,
            draw_guides: settings.draw_guides,
            guide_line_width: editor_style.guide_line_width,
        }
    }

    /// Every paragraph, top to bottom.
    pub fn paragraphs(&self) -> &[ParagraphLayout] {
        &self.paragraphs
    }

    /// Layout of one paragraph.
    pub fn paragraph_geometry(&self, index: usize) -> Option<&ParagraphLayout> {
        self.paragraphs.get(index)
    }

    /// Geometry of the item rendered by `node`.
    pub fn item_geometry(&self, node: NodeId) -> Option<ItemGeometry> {
        self.by_node
            .get(&node)
            .map(|&index| self.paragraphs[index].geometry)
    }

    /// Paragraph layout of `node`.
    pub fn paragraph_of(&self, node: NodeId) -> Option<&ParagraphLayout> {
        self.by_node.get(&node).map(|&index| &self.paragraphs[index])
    }

    /// Height of the whole document.
    pub fn document_height(&self) -> f32 {
        self.height
    }

    /// Line fragments intersecting a character range, in order.
    pub fn line_fragments(&self, range: Range<usize>) -> Vec<&LineFragment> {
        self.paragraphs
            .iter()
            .flat_map(|p| &p.fragments)
            .filter(|f| {
                if range.is_empty() {
                    f.char_range.contains(&range.start)
                        || (f.char_range.is_empty() && f.char_range.start == range.start)
                } else {
                    f.char_range.start < range.end && range.start < f.char_range.end
                }
            })
            .collect()
    }

    /// Paragraph whose vertical extent contains `y`, clamped to the first/last.
    pub fn paragraph_index_at_y(&self, y: f32) -> usize {
        let index = self
            .paragraphs
            .partition_point(|p| p.geometry.item_rect.max_y() <= y);
        index.min(self.paragraphs.len().saturating_sub(1))
    }

    fn fragment_at_y(&self, y: f32) -> Option<&LineFragment> {
        let paragraph = self.paragraphs.get(self.paragraph_index_at_y(y))?;
        let index = paragraph
            .fragments
            .partition_point(|f| f.rect.max_y() <= y)
            .min(paragraph.fragments.len().saturating_sub(1));
        paragraph.fragments.get(index)
    }

    fn paragraph_for_char(&self, index: usize) -> Option<&ParagraphLayout> {
        let position = self
            .paragraphs
            .partition_point(|p| p.char_range.end <= index)
            .min(self.paragraphs.len().saturating_sub(1));
        self.paragraphs.get(position)
    }

    fn advance_of(&self, fragment: &LineFragment) -> f32 {
        self.paragraphs
            .get(fragment.paragraph)
            .map_or(1.0, |p| p.style.font.cell_advance)
    }

    /// Character index nearest to `point`, the way a text view places the caret.
    pub fn char_index_at_point(&self, point: Point) -> usize {
        let Some(fragment) = self.fragment_at_y(point.y) else {
            return 0;
        };
        let advance = self.advance_of(fragment);
        for (offset, (x, w)) in fragment
            .glyph_spans(advance, self.tab_width)
            .into_iter()
            .enumerate()
        {
            if point.x < x + w / 2.0 {
                return fragment.char_range.start + offset;
            }
        }
        fragment.char_range.start + fragment.text.chars().count()
    }

    /// Rect of the glyph at `index`. Terminators get the reserved trailing slot.
    pub fn glyph_rect(&self, index: usize) -> Option<Rect> {
        let paragraph = self.paragraph_for_char(index)?;
        let fragment = paragraph
            .fragments
            .iter()
            .find(|f| f.char_range.contains(&index))?;
        let advance = paragraph.style.font.cell_advance;
        let spans = fragment.glyph_spans(advance, self.tab_width);
        let offset = index - fragment.char_range.start;
        let used = fragment.used_rect;
        match spans.get(offset) {
            Some(&(x, w)) => Some(Rect::new(x, used.min_y(), w, used.size.height)),
            None => {
                let x = spans
                    .last()
                    .map_or(fragment.text_origin_x, |&(x, w)| x + w);
                Some(Rect::new(x, used.min_y(), advance, used.size.height))
            }
        }
    }

    /// Glyph rects covering a character range, merged per line.
    pub fn rects_for_range(&self, range: Range<usize>) -> Vec<Rect> {
        let mut rects = Vec::new();
        for fragment in self.line_fragments(range.clone()) {
            let from = range.start.max(fragment.char_range.start);
            let to = range.end.min(fragment.char_range.end);
            let merged = (from..to)
                .filter_map(|i| self.glyph_rect(i))
                .reduce(|a, b| a.union(&b));
            if let Some(rect) = merged {
                rects.push(rect);
            }
        }
        rects
    }

    /// Guide lines for the branches intersecting `range`.
    pub fn guide_lines<M: DocumentModel>(
        &self,
        storage: &OutlineTextStorage<M>,
        range: Range<usize>,
    ) -> Vec<GuideLine> {
        if !self.draw_guides {
            return Vec::new();
        }
        let table = storage.paragraphs();
        storage
            .model()
            .guide_ranges(range)
            .into_iter()
            .filter_map(|span| {
                let ancestor = self.paragraphs.get(table.paragraph_index_at(span.start))?;
                let last = self
                    .paragraphs
                    .get(table.paragraph_index_at(span.end.saturating_sub(1)))?;
                let node = ancestor.node?;
                if !ancestor.style.draws_handle_paint() {
                    return None;
                }
                let handle_size = ancestor.style.handle_size?;
                let handle = ancestor.geometry.handle_rect;
                let top = handle.mid_y() + handle_size / 2.0;
                let height = last.geometry.item_rect.max_y() - top;
                (height > 0.0).then(|| GuideLine {
                    node,
                    rect: Rect::new(
                        handle.mid_x() - self.guide_line_width / 2.0,
                        top,
                        self.guide_line_width,
                        height,
                    ),
                })
            })
            .collect()
    }

    /// Seams between consecutive paragraphs covered by a non-empty `selection`.
    pub fn selection_gaps(&self, selection: Range<usize>) -> Vec<SelectionGap> {
        if selection.is_empty() {
            return Vec::new();
        }
        let first = self
            .paragraphs
            .partition_point(|p| p.char_range.end <= selection.start);
        let last = self
            .paragraphs
            .partition_point(|p| p.char_range.start < selection.end);
        (first..last)
            .filter(|&i| i + 1 < self.paragraphs.len())
            .map(|i| {
                let upper = &self.paragraphs[i];
                let lower = &self.paragraphs[i + 1];
                let a = upper.geometry.item_rect;
                let b = lower.geometry.item_rect;
                let terminator = upper.char_range.end.saturating_sub(1);
                let min_x = a.min_x().min(b.min_x());
                let max_x = a.max_x().max(b.max_x());
                SelectionGap {
                    paragraph: i,
                    rect: Rect::new(
                        min_x,
                        a.max_y(),
                        max_x - min_x,
                        (b.min_y() - a.max_y()).max(0.0),
                    ),
                    selected: selection.start <= terminator && terminator < selection.end,
                }
            })
            .collect()
    }

    /// Handle bullets for every paragraph whose style declares a handle.
    pub fn handle_marks<M: DocumentModel>(
        &self,
        storage: &OutlineTextStorage<M>,
    ) -> Vec<HandleMark> {
        let model = storage.model();
        self.paragraphs
            .iter()
            .filter_map(|p| {
                let node = p.node?;
                let size = p.style.handle_size?;
                if node == model.root() {
                    return None;
                }
                let collapsed = !model.is_expanded(node) && model.first_child(node).is_some();
                Some(HandleMark {
                    node,
                    rect: p.geometry.handle_rect.centered(Size::new(size, size)),
                    collapsed,
                })
            })
            .collect()
    }

    /// Invisible glyph placements inside `selection`, empty unless invisibles are shown.
    pub fn invisible_glyphs(&self, selection: Range<usize>) -> Vec<InvisibleGlyph> {
        if !self.show_invisibles || selection.is_empty() {
            return Vec::new();
        }
        let mut glyphs = Vec::new();
        for fragment in self.line_fragments(selection.clone()) {
            let advance = self.advance_of(fragment);
            let spans = fragment.glyph_spans(advance, self.tab_width);
            let chars = fragment.text.chars().chain(
                (fragment.char_range.len() > spans.len())
                    .then_some('\n')
                    .into_iter(),
            );
            for (offset, ch) in chars.enumerate() {
                let index = fragment.char_range.start + offset;
                if !selection.contains(&index) {
                    continue;
                }
                let glyph = match ch {
                    ' ' => SPACE_INVISIBLE,
                    '\t' => TAB_INVISIBLE,
                    '\u{2028}' => LINE_SEPARATOR_INVISIBLE,
                    '\n' => NEWLINE_INVISIBLE,
                    _ => continue,
                };
                let Some(slot) = self.glyph_rect(index) else {
                    continue;
                };
                let glyph_width = char_width(glyph) as f32 * advance;
                let rect = if ch == '\t' {
                    slot.centered(Size::new(glyph_width, slot.size.height))
                } else {
                    Rect::new(slot.min_x(), slot.min_y(), glyph_width, slot.size.height)
                };
                glyphs.push(InvisibleGlyph {
                    character_index: index,
                    glyph,
                    rect,
                });
            }
        }
        glyphs
    }
}

fn item_geometry(fragments: &[LineFragment], per_level: f32, padding: f32) -> ItemGeometry {
    let Some(first) = fragments.first() else {
        return ItemGeometry::default();
    };
    let rect = fragments
        .iter()
        .map(|f| f.rect)
        .reduce(|a, b| a.union(&b))
        .unwrap_or(first.rect);
    let used = fragments
        .iter()
        .map(|f| f.used_rect)
        .reduce(|a, b| a.union(&b))
        .unwrap_or(first.used_rect);
    let item_rect = Rect::new(
        rect.min_x() + padding,
        rect.min_y(),
        (rect.size.width - 2.0 * padding).max(0.0),
        rect.size.height,
    );
    let handle_rect = Rect::new(
        used.min_x() - per_level + padding,
        first.used_rect.min_y(),
        per_level,
        first.used_rect.size.height,
    );
    ItemGeometry {
        item_rect,
        item_used_rect: used,
        handle_rect,
    }
}

/// Layout engine: owns the container width and caches the last pass.
///
/// A pass is reused only while the storage version, the context generation and the
/// container width are all unchanged.
#[derive(Debug)]
pub struct LayoutEngine {
    container_width: f32,
    tab_width: usize,
    pass: Option<Layout>,
    passes_computed: usize,
}

impl LayoutEngine {
    /// Create an engine for a container of `container_width` points.
    pub fn new(container_width: f32) -> Self {
        Self {
            container_width,
            tab_width: DEFAULT_TAB_WIDTH,
            pass: None,
            passes_computed: 0,
        }
    }

    /// Container width in points.
    pub fn container_width(&self) -> f32 {
        self.container_width
    }

    /// Resize the container.
    pub fn set_container_width(&mut self, width: f32) {
        self.container_width = width.max(0.0);
    }

    /// Tab width in cells.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Set the tab width (minimum 1).
    pub fn set_tab_width(&mut self, tab_width: usize) {
        self.tab_width = tab_width.max(1);
        self.pass = None;
    }

    /// Throw the cached pass away.
    pub fn invalidate(&mut self) {
        self.pass = None;
    }

    /// How many passes have been computed so far.
    pub fn passes_computed(&self) -> usize {
        self.passes_computed
    }

    /// The current layout, recomputed if anything it depends on changed.
    pub fn layout<M: DocumentModel>(
        &mut self,
        storage: &OutlineTextStorage<M>,
        context: &EditorContext,
    ) -> &Layout {
        let key = LayoutKey {
            version: storage.version(),
            generation: context.generation(),
            width_bits: self.container_width.to_bits(),
        };
        if self.pass.as_ref().is_some_and(|pass| pass.key != key) {
            self.pass = None;
        }
        if self.pass.is_none() {
            self.passes_computed += 1;
        }
        let (width, tab_width) = (self.container_width, self.tab_width);
        self.pass
            .get_or_insert_with(|| Layout::compute(storage, context, width, tab_width, key))
    }
}
