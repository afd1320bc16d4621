//! Node-anchored selection with an expand/contract ladder.
//!
//! Selection endpoints are stored as `(node, offset)` pairs so they follow their
//! paragraphs across edits elsewhere in the buffer. All range ↔ node translation goes
//! through the storage's paragraph table.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::model::{DocumentModel, NodeId};
use crate::text_storage::OutlineTextStorage;

/// One selection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPoint {
    /// Node of the paragraph the endpoint lies in.
    pub node: NodeId,
    /// Character offset from the paragraph start (may equal the paragraph length).
    pub offset: usize,
    location: usize,
}

impl SelectionPoint {
    fn at<M: DocumentModel>(storage: &OutlineTextStorage<M>, location: usize) -> Self {
        let location = location.min(storage.len());
        let index = storage.paragraph_index_at(location);
        let start = storage.paragraph_range(index).start;
        Self {
            node: storage
                .paragraphs()
                .id(index)
                .unwrap_or_else(|| storage.model().root()),
            offset: location - start,
            location,
        }
    }

    fn resolve<M: DocumentModel>(&self, storage: &OutlineTextStorage<M>) -> usize {
        match storage.paragraph_range_of(self.node) {
            Some(range) => (range.start + self.offset).min(range.end),
            None => self.location.min(storage.len()),
        }
    }
}

/// Rungs of the expand-selection ladder, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionLevel {
    /// Word under or around the selection.
    Word,
    /// Sentence.
    Sentence,
    /// Paragraph body.
    Paragraph,
    /// Node plus its visible descendants.
    Branch,
    /// Whole buffer.
    Document,
}

impl SelectionLevel {
    /// Every rung, narrowest first.
    pub const LADDER: [SelectionLevel; 5] = [
        SelectionLevel::Word,
        SelectionLevel::Sentence,
        SelectionLevel::Paragraph,
        SelectionLevel::Branch,
        SelectionLevel::Document,
    ];
}

/// Current selection plus the stack of ranges it was expanded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    anchor: SelectionPoint,
    head: SelectionPoint,
    expansions: Vec<Range<usize>>,
}

impl SelectionState {
    /// A caret at `location`.
    pub fn caret<M: DocumentModel>(storage: &OutlineTextStorage<M>, location: usize) -> Self {
        let mut selection = Self {
            anchor: SelectionPoint::at(storage, 0),
            head: SelectionPoint::at(storage, 0),
            expansions: Vec::new(),
        };
        selection.select(storage, location..location);
        selection
    }

    /// Anchor endpoint.
    pub fn anchor(&self) -> SelectionPoint {
        self.anchor
    }

    /// Head (moving) endpoint.
    pub fn head(&self) -> SelectionPoint {
        self.head
    }

    /// Number of expansions [`contract`](Self::contract) can undo.
    pub fn expansion_depth(&self) -> usize {
        self.expansions.len()
    }

    /// Selected character range.
    pub fn range<M: DocumentModel>(&self, storage: &OutlineTextStorage<M>) -> Range<usize> {
        let a = self.anchor.resolve(storage);
        let h = self.head.resolve(storage);
        a.min(h)..a.max(h)
    }

    /// Nodes whose paragraphs the selection covers.
    pub fn nodes<M: DocumentModel>(&self, storage: &OutlineTextStorage<M>) -> Vec<NodeId> {
        storage.node_ids_in_range(self.range(storage))
    }

    /// Replace the selection. Clears the expansion stack.
    pub fn select<M: DocumentModel>(
        &mut self,
        storage: &OutlineTextStorage<M>,
        range: Range<usize>,
    ) {
        self.expansions.clear();
        self.set(storage, range);
    }

    /// Move the head, keeping the anchor. Clears the expansion stack.
    pub fn extend_to<M: DocumentModel>(
        &mut self,
        storage: &OutlineTextStorage<M>,
        location: usize,
    ) {
        self.expansions.clear();
        let location = constrain_caret(storage, location..location).start;
        self.head = SelectionPoint::at(storage, location);
    }

    fn set<M: DocumentModel>(&mut self, storage: &OutlineTextStorage<M>, range: Range<usize>) {
        let range = constrain_caret(storage, range);
        self.anchor = SelectionPoint::at(storage, range.start);
        self.head = SelectionPoint::at(storage, range.end);
    }

    /// Grow the selection to the first rung that strictly contains it. Returns the rung
    /// applied, or `None` when the whole buffer is already selected.
    pub fn expand<M: DocumentModel>(
        &mut self,
        storage: &OutlineTextStorage<M>,
    ) -> Option<SelectionLevel> {
        let current = self.range(storage);
        for level in SelectionLevel::LADDER {
            let Some(candidate) = expanded_range(storage, current.clone(), level) else {
                continue;
            };
            if candidate != current
                && candidate.start <= current.start
                && current.end <= candidate.end
            {
                tracing::trace!(?level, from = ?current, to = ?candidate, "expand selection");
                self.expansions.push(current);
                self.set(storage, candidate);
                return Some(level);
            }
        }
        None
    }

    /// Undo one expansion. Returns `false` when there is nothing to undo.
    pub fn contract<M: DocumentModel>(&mut self, storage: &OutlineTextStorage<M>) -> bool {
        match self.expansions.pop() {
            Some(previous) => {
                self.set(storage, previous);
                true
            }
            None => false,
        }
    }
}

/// An empty selection at the end of a non-empty buffer moves onto the final terminator.
fn constrain_caret<M: DocumentModel>(
    storage: &OutlineTextStorage<M>,
    range: Range<usize>,
) -> Range<usize> {
    let len = storage.len();
    let range = range.start.min(len)..range.end.min(len).max(range.start.min(len));
    if range.is_empty() && len > 0 && range.start == len {
        len - 1..len - 1
    } else {
        range
    }
}

/// The range `level` would select around `current`, if it applies.
pub fn expanded_range<M: DocumentModel>(
    storage: &OutlineTextStorage<M>,
    current: Range<usize>,
    level: SelectionLevel,
) -> Option<Range<usize>> {
    match level {
        SelectionLevel::Word => segment_range(storage, current, |body| {
            body.split_word_bound_indices()
                .filter(|(_, word)| word.chars().any(char::is_alphanumeric))
                .map(|(i, word)| (i, word.len()))
                .collect()
        }),
        SelectionLevel::Sentence => segment_range(storage, current, |body| {
            body.split_sentence_bound_indices()
                .map(|(i, sentence)| (i, sentence.trim_end().len()))
                .filter(|&(_, len)| len > 0)
                .collect()
        }),
        SelectionLevel::Paragraph => {
            let indices = storage.paragraphs().paragraph_indices_for(current.clone());
            if indices.len() == 1 {
                let body = storage.body_range(indices.start);
                if body.start <= current.start && current.end <= body.end {
                    return Some(body);
                }
            }
            Some(storage.paragraph_range_for(current))
        }
        SelectionLevel::Branch => {
            let node = storage.node_at(current.start)?;
            let model = storage.model();
            if node == model.root() {
                return Some(0..storage.len());
            }
            let mut last = node;
            while model.is_expanded(last)
                && let Some(child) = model.last_child(last)
            {
                last = child;
            }
            let start = storage.paragraph_range_of(node)?.start;
            let end = storage.paragraph_range_of(last)?.end;
            Some(start.min(current.start)..end.max(current.end))
        }
        SelectionLevel::Document => Some(0..storage.len()),
    }
}

/// Union of the body segments intersecting `current`, or the segment containing an empty
/// `current`. Only applies inside a single paragraph body.
fn segment_range<M: DocumentModel>(
    storage: &OutlineTextStorage<M>,
    current: Range<usize>,
    segments: impl FnOnce(&str) -> Vec<(usize, usize)>,
) -> Option<Range<usize>> {
    let index = storage.paragraph_index_at(current.start);
    let body_range = storage.body_range(index);
    if current.start < body_range.start || current.end > body_range.end {
        return None;
    }
    let body = storage.text_in_range(body_range.clone());
    let to_char = |byte: usize| body[..byte].chars().count();

    let local = current.start - body_range.start..current.end - body_range.start;
    let mut covered: Option<Range<usize>> = None;
    for (byte, len) in segments(&body) {
        let seg = to_char(byte)..to_char(byte + len);
        let hit = if local.is_empty() {
            seg.start <= local.start && local.start <= seg.end
        } else {
            seg.start < local.end && local.start < seg.end
        };
        if hit {
            covered = Some(match covered {
                Some(c) => c.start.min(seg.start)..c.end.max(seg.end),
                None => seg,
            });
        }
    }
    covered.map(|c| {
        body_range.start + c.start.min(local.start)..body_range.start + c.end.max(local.end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOutline;

    fn storage(text: &str) -> OutlineTextStorage<MemoryOutline> {
        OutlineTextStorage::new(MemoryOutline::from_outline_text(text)).unwrap()
    }

    #[test]
    fn test_ladder_from_caret() {
        let storage = storage("Hello world. Bye now.\n\tchild\nnext\n");
        let mut selection = SelectionState::caret(&storage, 1);

        assert_eq!(selection.expand(&storage), Some(SelectionLevel::Word));
        assert_eq!(selection.range(&storage), 0..5);
        assert_eq!(selection.expand(&storage), Some(SelectionLevel::Sentence));
        assert_eq!(selection.range(&storage), 0..12);
        assert_eq!(selection.expand(&storage), Some(SelectionLevel::Paragraph));
        assert_eq!(selection.range(&storage), 0..21);
        assert_eq!(selection.expand(&storage), Some(SelectionLevel::Branch));
        assert_eq!(selection.range(&storage), 0..28);
        assert_eq!(selection.expand(&storage), Some(SelectionLevel::Document));
        assert_eq!(selection.range(&storage), 0..storage.len());
        assert_eq!(selection.expand(&storage), None);

        assert!(selection.contract(&storage));
        assert_eq!(selection.range(&storage), 0..28);
    }

    #[test]
    fn test_contract_on_empty_stack_is_noop() {
        let storage = storage("one\n");
        let mut selection = SelectionState::caret(&storage, 1);
        assert!(!selection.contract(&storage));
        assert_eq!(selection.range(&storage), 1..1);
    }

    #[test]
    fn test_other_changes_clear_the_stack() {
        let storage = storage("one two\n");
        let mut selection = SelectionState::caret(&storage, 1);
        selection.expand(&storage);
        assert_eq!(selection.expansion_depth(), 1);
        selection.select(&storage, 4..4);
        assert_eq!(selection.expansion_depth(), 0);
    }

    #[test]
    fn test_caret_at_end_is_constrained() {
        let storage = storage("one\n");
        let selection = SelectionState::caret(&storage, 4);
        assert_eq!(selection.range(&storage), 3..3);
    }

    #[test]
    fn test_empty_document_resolves_to_root() {
        let storage = OutlineTextStorage::new(MemoryOutline::new()).unwrap();
        let selection = SelectionState::caret(&storage, 0);
        assert_eq!(selection.head().node, storage.model().root());
        assert_eq!(selection.range(&storage), 0..0);
    }

    #[test]
    fn test_endpoints_follow_their_paragraphs() {
        let mut storage = storage("one\ntwo\n");
        let mut selection = SelectionState::caret(&storage, 0);
        selection.select(&storage, 4..7);
        storage.replace_range(0..0, "zero\n").unwrap();
        assert_eq!(selection.range(&storage), 9..12);
        assert_eq!(storage.text_in_range(selection.range(&storage)), "two");
    }
}
