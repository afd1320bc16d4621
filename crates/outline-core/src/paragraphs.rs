//! Paragraph table
//!
//! The character buffer is a [`Rope`] so paragraph lookups and splices are O(log N). Next
//! to it sits one slot per paragraph holding the id of the node that paragraph renders.
//!
//! A non-empty buffer always ends with `'\n'`, so the rope's trailing empty line is not a
//! paragraph. An empty buffer has exactly one zero-length placeholder paragraph.
//!
//! Splices keep slots exact where they can (whole-paragraph insertions and deletions, the
//! shape tree-side edits take) and otherwise carry old ids over pairwise and mark them
//! unverified. Unverified runs are re-resolved against the document model in one batch
//! once both sides hold the same text.

use std::collections::HashMap;
use std::ops::Range;

use ropey::Rope;

use crate::model::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    id: Option<NodeId>,
    verified: bool,
}

impl Slot {
    const UNRESOLVED: Slot = Slot {
        id: None,
        verified: false,
    };

    fn tentative(id: Option<NodeId>) -> Self {
        Self {
            id,
            verified: false,
        }
    }
}

/// What a splice replaced, so it can be reverted.
#[derive(Debug, Clone)]
pub struct SpliceRecord {
    /// Character range now occupied by the inserted text.
    pub inserted_range: Range<usize>,
    /// Text that was removed.
    pub removed_text: String,
    first_slot: usize,
    inserted_slots: usize,
    removed_slots: Vec<Slot>,
}

impl SpliceRecord {
    /// Paragraph indices occupied by the inserted text.
    pub fn paragraph_window(&self) -> Range<usize> {
        self.first_slot..self.first_slot + self.inserted_slots
    }
}

/// Rope-backed buffer plus paragraph → node table.
#[derive(Debug, Clone)]
pub struct ParagraphTable {
    rope: Rope,
    slots: Vec<Slot>,
    positions: HashMap<NodeId, usize>,
}

impl Default for ParagraphTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParagraphTable {
    /// Empty buffer with an unresolved placeholder paragraph.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Build a table over `text`; every slot starts unresolved.
    pub fn from_text(text: &str) -> Self {
        let rope = Rope::from_str(text);
        let mut table = Self {
            rope,
            slots: Vec::new(),
            positions: HashMap::new(),
        };
        table.slots = vec![Slot::UNRESOLVED; table.paragraph_count()];
        table
    }

    /// Buffer length in characters.
    pub fn len(&self) -> usize {
        self.rope.len_chars()
    }

    /// `true` if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Whole buffer.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Text of a character range (clamped).
    pub fn slice(&self, range: Range<usize>) -> String {
        let range = self.clamp(range);
        self.rope.slice(range).to_string()
    }

    /// Character at `offset`.
    pub fn char_at(&self, offset: usize) -> Option<char> {
        (offset < self.len()).then(|| self.rope.char(offset))
    }

    /// Clamp a range to the buffer.
    pub fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let len = self.len();
        let start = range.start.min(len);
        start..range.end.clamp(start, len)
    }

    fn ends_with_newline(&self) -> bool {
        let len = self.len();
        len > 0 && self.rope.char(len - 1) == '\n'
    }

    /// Number of paragraphs (at least one).
    pub fn paragraph_count(&self) -> usize {
        let lines = self.rope.len_lines();
        if self.ends_with_newline() {
            lines - 1
        } else {
            lines
        }
    }

    /// Index of the paragraph containing `offset`. Offsets at or past the end map to the
    /// last paragraph.
    pub fn paragraph_index_at(&self, offset: usize) -> usize {
        let last = self.paragraph_count() - 1;
        if offset >= self.len() {
            return last;
        }
        self.rope.char_to_line(offset).min(last)
    }

    /// Character range of a paragraph, terminator included.
    pub fn paragraph_range(&self, index: usize) -> Range<usize> {
        let index = index.min(self.paragraph_count() - 1);
        let start = self.rope.line_to_char(index);
        let end = if index + 1 < self.rope.len_lines() {
            self.rope.line_to_char(index + 1)
        } else {
            self.len()
        };
        start..end
    }

    /// Character range of a paragraph body (terminator excluded).
    pub fn body_range(&self, index: usize) -> Range<usize> {
        let range = self.paragraph_range(index);
        if range.end > range.start && self.rope.char(range.end - 1) == '\n' {
            range.start..range.end - 1
        } else {
            range
        }
    }

    /// Body text of a paragraph.
    pub fn body_text(&self, index: usize) -> String {
        self.rope.slice(self.body_range(index)).to_string()
    }

    /// Paragraph indices covered by `range`. A range ending exactly at a paragraph
    /// start does not cover that paragraph; an empty range covers the paragraph
    /// containing its location.
    pub fn paragraph_indices_for(&self, range: Range<usize>) -> Range<usize> {
        let range = self.clamp(range);
        let first = self.paragraph_index_at(range.start);
        let last = if range.end > range.start {
            self.paragraph_index_at(range.end - 1)
        } else {
            first
        };
        first..last + 1
    }

    /// Union of the character ranges of the paragraphs covered by `range`.
    pub fn paragraph_range_for(&self, range: Range<usize>) -> Range<usize> {
        let indices = self.paragraph_indices_for(range);
        let start = self.paragraph_range(indices.start).start;
        let end = self.paragraph_range(indices.end - 1).end;
        start..end
    }

    /// Node id of a paragraph, verified or not.
    pub fn id(&self, index: usize) -> Option<NodeId> {
        self.slots.get(index).and_then(|slot| slot.id)
    }

    /// Known ids of the paragraphs in `indices`.
    pub fn ids(&self, indices: Range<usize>) -> Vec<NodeId> {
        let end = indices.end.min(self.slots.len());
        let start = indices.start.min(end);
        self.slots[start..end].iter().filter_map(|s| s.id).collect()
    }

    /// Index of the paragraph rendering `id`.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    fn unindex(&mut self, window: Range<usize>) {
        for index in window {
            if let Some(id) = self.slots[index].id
                && self.positions.get(&id) == Some(&index)
            {
                self.positions.remove(&id);
            }
        }
    }

    fn reindex(&mut self, window: Range<usize>) {
        for index in window {
            if let Some(id) = self.slots[index].id {
                self.positions.insert(id, index);
            }
        }
    }

    /// Reindex after `removed` slots at `first` were replaced by `inserted` slots. Later
    /// paragraphs only move when the count changed.
    fn reindex_after_splice(&mut self, first: usize, removed: usize, inserted: usize) {
        let end = if removed == inserted {
            first + inserted
        } else {
            self.slots.len()
        };
        self.reindex(first..end);
    }

    /// `true` if every slot has been resolved against the model.
    pub fn is_verified(&self) -> bool {
        self.slots.iter().all(|slot| slot.verified)
    }

    /// Maximal runs of paragraph indices whose slots need resolving.
    pub fn unverified_runs(&self) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;
        for (index, slot) in self.slots.iter().enumerate() {
            match (slot.verified, start) {
                (false, None) => start = Some(index),
                (true, Some(s)) => {
                    runs.push(s..index);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..self.slots.len());
        }
        runs
    }

    /// Character range spanned by the paragraphs in `indices`.
    pub fn char_range_of(&self, indices: Range<usize>) -> Range<usize> {
        if indices.is_empty() {
            let at = self.paragraph_range(indices.start).start;
            return at..at;
        }
        self.paragraph_range(indices.start).start..self.paragraph_range(indices.end - 1).end
    }

    /// Record resolved ids for a run of paragraphs.
    pub fn assign(&mut self, indices: Range<usize>, ids: &[NodeId]) {
        debug_assert_eq!(indices.len(), ids.len());
        self.unindex(indices.clone());
        for (slot, id) in self.slots[indices.clone()].iter_mut().zip(ids) {
            *slot = Slot {
                id: Some(*id),
                verified: true,
            };
        }
        self.reindex(indices);
    }

    /// Forget every resolved id.
    pub fn invalidate_ids(&mut self) {
        for slot in &mut self.slots {
            slot.verified = false;
        }
    }

    /// Replace `range` with `text` and update the slots.
    pub fn splice(&mut self, range: Range<usize>, text: &str) -> SpliceRecord {
        let range = self.clamp(range);
        let was_empty = self.is_empty();
        let text_len = text.chars().count();

        let start_line = self.rope.char_to_line(range.start);
        let end_line = self.rope.char_to_line(range.end);
        let whole_paragraphs = !was_empty
            && self.ends_with_newline()
            && self.rope.line_to_char(start_line) == range.start
            && self.rope.line_to_char(end_line) == range.end
            && (text.is_empty() || text.ends_with('\n'));

        let (old_window, carry) = if was_empty {
            (0..1, false)
        } else if whole_paragraphs {
            (start_line..end_line, false)
        } else {
            let first = self.paragraph_index_at(range.start);
            (first..self.paragraph_index_at(range.end) + 1, true)
        };

        let removed_text = self.rope.slice(range.clone()).to_string();
        self.rope.remove(range.clone());
        self.rope.insert(range.start, text);

        let inserted_slots = if self.is_empty() {
            1
        } else if was_empty {
            self.paragraph_count()
        } else if whole_paragraphs {
            text.matches('\n').count()
        } else {
            self.paragraph_index_at(range.start + text_len) - old_window.start + 1
        };

        let new_slots: Vec<Slot> = (0..inserted_slots)
            .map(|i| {
                let carried = if carry && i < old_window.len() {
                    self.slots[old_window.start + i].id
                } else {
                    None
                };
                Slot::tentative(carried)
            })
            .collect();
        let first_slot = old_window.start;
        self.unindex(old_window.clone());
        let removed_slots: Vec<Slot> = self.slots.splice(old_window, new_slots).collect();
        self.reindex_after_splice(first_slot, removed_slots.len(), inserted_slots);
        debug_assert_eq!(self.slots.len(), self.paragraph_count());

        SpliceRecord {
            inserted_range: range.start..range.start + text_len,
            removed_text,
            first_slot,
            inserted_slots,
            removed_slots,
        }
    }

    /// Undo a splice. Must be the most recent splice applied to this table.
    pub fn revert(&mut self, record: SpliceRecord) {
        self.rope.remove(record.inserted_range.clone());
        self.rope
            .insert(record.inserted_range.start, &record.removed_text);
        let window = record.first_slot..record.first_slot + record.inserted_slots;
        let restored = record.removed_slots.len();
        self.unindex(window.clone());
        self.slots.splice(window, record.removed_slots);
        self.reindex_after_splice(record.first_slot, record.inserted_slots, restored);
        debug_assert_eq!(self.slots.len(), self.paragraph_count());
    }
}
