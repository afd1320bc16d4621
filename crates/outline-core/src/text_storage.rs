//! Buffer ↔ tree synchronization.
//!
//! [`OutlineTextStorage`] owns a [`DocumentModel`], the flat paragraph buffer that a text
//! view renders and the per-node metadata cache. Edits flow in two directions:
//!
//! - **View → model**: [`replace_range`](OutlineTextStorage::replace_range) splices the
//!   buffer and forwards the same edit to the model. Whatever the model reports back while
//!   the edit is being forwarded is an echo and is dropped.
//! - **Model → view**: [`sync_from_model`](OutlineTextStorage::sync_from_model) drains the
//!   model's change notifications and splices them into the buffer without forwarding
//!   them back.
//!
//! Edits are grouped into brackets ([`begin_edit`](OutlineTextStorage::begin_edit) /
//! [`end_edit`](OutlineTextStorage::end_edit)). Tree edits arriving inside a bracket are
//! queued and applied in order when the outermost bracket closes, which is also when the
//! single coalesced [`StorageChange`] is delivered to subscribers and the model's undo
//! group is closed.
//!
//! # Example
//!
//! ```rust
//! use outline_core::{DocumentModel, MemoryOutline, OutlineTextStorage};
//!
//! let outline = MemoryOutline::from_outline_text("one\ntwo\nthree @tag\n");
//! let mut storage = OutlineTextStorage::new(outline).unwrap();
//!
//! storage.replace_range(4..7, "TWO").unwrap();
//! assert_eq!(storage.text(), "one\nTWO\nthree @tag\n");
//! assert_eq!(storage.model().displayed_text(), storage.text());
//! ```

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::ops::Range;
use std::rc::Rc;

use crate::delta::{TextDelta, TextDeltaEdit};
use crate::error::{OutlineError, Result};
use crate::line_ending::{has_unnormalized_line_endings, normalize_line_endings};
use crate::metadata::{NodeMetadata, NodeMetadataCache};
use crate::model::{DocumentModel, NodeId, TreeChange, TreeEdit};
use crate::paragraphs::ParagraphTable;
use crate::sync::SyncState;

/// Default number of paragraphs fetched on a metadata cache miss.
pub const DEFAULT_METADATA_BATCH_SIZE: usize = 64;

/// Which side produced the edits of a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    /// Typing, paste and other buffer-side edits.
    View,
    /// Tree-side changes spliced into the buffer.
    Model,
    /// Both sides contributed.
    Mixed,
}

impl EditOrigin {
    fn merge(self, other: EditOrigin) -> EditOrigin {
        if self == other {
            self
        } else {
            EditOrigin::Mixed
        }
    }
}

/// Coalesced notification delivered when the outermost edit bracket closes.
#[derive(Debug, Clone)]
pub struct StorageChange {
    /// Version before the bracket.
    pub old_version: u64,
    /// Version after the bracket.
    pub new_version: u64,
    /// Union of the edited ranges, in post-edit coordinates.
    pub edited_range: Range<usize>,
    /// Net change in buffer length.
    pub change_in_length: isize,
    /// Who produced the edits.
    pub origin: EditOrigin,
    /// Every splice of the bracket, in order.
    pub delta: Rc<TextDelta>,
    /// Nodes whose cached metadata was evicted.
    pub evicted: Vec<NodeId>,
}

/// Storage change callback function type
pub type StorageChangeCallback = Box<dyn FnMut(&StorageChange)>;

#[derive(Debug)]
struct Bracket {
    old_version: u64,
    edited_range: Option<Range<usize>>,
    change_in_length: isize,
    origin: Option<EditOrigin>,
    delta: TextDelta,
    evicted: Vec<NodeId>,
}

impl Bracket {
    fn new(old_version: u64, len: usize) -> Self {
        Self {
            old_version,
            edited_range: None,
            change_in_length: 0,
            origin: None,
            delta: TextDelta {
                before_char_count: len,
                after_char_count: len,
                edits: Vec::new(),
            },
            evicted: Vec::new(),
        }
    }

    fn record(&mut self, edit: TextDeltaEdit, origin: EditOrigin, len_after: usize) {
        let replaced = edit.start..edit.end();
        let inserted = edit.inserted_len();
        let map = |pos: usize| {
            if pos <= replaced.start {
                pos
            } else if pos >= replaced.end {
                pos - replaced.len() + inserted
            } else {
                replaced.start + inserted
            }
        };
        let new_range = replaced.start..replaced.start + inserted;
        self.edited_range = Some(match self.edited_range.take() {
            Some(prev) => {
                let (start, end) = (map(prev.start), map(prev.end));
                start.min(new_range.start)..end.max(new_range.end)
            }
            None => new_range,
        });
        self.change_in_length += inserted as isize - replaced.len() as isize;
        self.origin = Some(match self.origin {
            Some(o) => o.merge(origin),
            None => origin,
        });
        self.delta.after_char_count = len_after;
        self.delta.edits.push(edit);
    }

    fn into_change(self, new_version: u64) -> Option<StorageChange> {
        if self.delta.is_empty() && self.evicted.is_empty() {
            return None;
        }
        Some(StorageChange {
            old_version: self.old_version,
            new_version,
            edited_range: self.edited_range.unwrap_or(0..0),
            change_in_length: self.change_in_length,
            origin: self.origin.unwrap_or(EditOrigin::Model),
            delta: Rc::new(self.delta),
            evicted: self.evicted,
        })
    }
}

/// The paragraph buffer kept in lockstep with a document model.
pub struct OutlineTextStorage<M: DocumentModel> {
    model: M,
    table: ParagraphTable,
    cache: RefCell<NodeMetadataCache>,
    state: SyncState,
    edit_depth: usize,
    pending: VecDeque<TreeChange>,
    bracket: Option<Bracket>,
    version: u64,
    subscribers: Vec<StorageChangeCallback>,
    metadata_generation: Option<(u64, u64)>,
    batch_size: usize,
}

impl<M: DocumentModel + std::fmt::Debug> std::fmt::Debug for OutlineTextStorage<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineTextStorage")
            .field("model", &self.model)
            .field("len", &self.table.len())
            .field("paragraphs", &self.table.paragraph_count())
            .field("state", &self.state)
            .field("edit_depth", &self.edit_depth)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl<M: DocumentModel> OutlineTextStorage<M> {
    /// Project `model` into a new buffer.
    ///
    /// Notifications the model queued before this call are discarded: the displayed text
    /// read here already reflects them.
    pub fn new(mut model: M) -> Result<Self> {
        model.take_changes();
        let table = ParagraphTable::from_text(&model.displayed_text());
        let mut storage = Self {
            model,
            table,
            cache: RefCell::new(NodeMetadataCache::new()),
            state: SyncState::Idle,
            edit_depth: 0,
            pending: VecDeque::new(),
            bracket: None,
            version: 0,
            subscribers: Vec::new(),
            metadata_generation: None,
            batch_size: DEFAULT_METADATA_BATCH_SIZE,
        };
        storage.resolve_paragraphs()?;
        Ok(storage)
    }

    /// The document model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Give the model back.
    pub fn into_model(self) -> M {
        self.model
    }

    /// The paragraph table.
    pub fn paragraphs(&self) -> &ParagraphTable {
        &self.table
    }

    /// Current synchronization direction.
    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    /// Monotonic buffer version, bumped on every splice.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// `true` while an edit bracket is open.
    pub fn is_editing(&self) -> bool {
        self.edit_depth > 0
    }

    /// Number of tree edits waiting for the outermost bracket to close.
    pub fn pending_tree_edits(&self) -> usize {
        self.pending.len()
    }

    /// Register a callback for coalesced storage changes.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&StorageChange) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    /// Set how many paragraphs a metadata miss fetches at once.
    pub fn set_metadata_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }

    // ---------------------------------------------------------------------
    // Edit brackets
    // ---------------------------------------------------------------------

    /// Open an edit bracket. Brackets nest; the outermost one owns the model's undo group.
    pub fn begin_edit(&mut self) {
        if self.edit_depth == 0 {
            self.model.begin_undo_grouping();
            self.bracket = Some(Bracket::new(self.version, self.table.len()));
        }
        self.edit_depth += 1;
    }

    /// Close an edit bracket. Closing the outermost bracket applies queued tree edits and
    /// notifies subscribers once.
    pub fn end_edit(&mut self) -> Result<()> {
        debug_assert!(self.edit_depth > 0, "end_edit without begin_edit");
        if self.edit_depth == 0 {
            return Ok(());
        }

        let flushed = if self.edit_depth == 1 {
            self.flush_pending()
        } else {
            Ok(())
        };

        self.edit_depth -= 1;
        if self.edit_depth == 0 {
            self.model.end_undo_grouping();
            if let Some(change) = self
                .bracket
                .take()
                .and_then(|b| b.into_change(self.version))
            {
                tracing::debug!(
                    range = ?change.edited_range,
                    delta = change.change_in_length,
                    origin = ?change.origin,
                    version = change.new_version,
                    "storage edited"
                );
                for subscriber in &mut self.subscribers {
                    subscriber(&change);
                }
            }
        }
        flushed
    }

    // ---------------------------------------------------------------------
    // View → model
    // ---------------------------------------------------------------------

    /// Replace `range` of the buffer with `text` and forward the edit to the model.
    ///
    /// Line endings in `text` are normalized to `'\n'`. Nothing is applied when the model
    /// rejects the edit.
    pub fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        if !self.state.is_idle() {
            return Err(OutlineError::Reentrant {
                active: self.state.as_str(),
                attempted: SyncState::ApplyingFromView.as_str(),
            });
        }
        debug_assert!(
            range.start <= range.end && range.end <= self.table.len(),
            "edit range {range:?} outside buffer of length {}",
            self.table.len()
        );
        let range = self.table.clamp(range);
        if has_unnormalized_line_endings(text) {
            tracing::debug!("normalizing line endings of inserted text");
        }
        let text = normalize_line_endings(text);

        self.begin_edit();
        let result = self.forward_view_edit(range, &text);
        let closed = self.end_edit();
        result.and(closed)
    }

    fn forward_view_edit(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        self.flush_pending()?;

        let range = self.table.clamp(range);
        let mut spliced = text.to_string();
        if range.end == self.table.len() {
            spliced.push('\n');
        }

        let touched = self
            .table
            .ids(self.table.paragraph_indices_for(range.clone()));

        self.state.enter(SyncState::ApplyingFromView)?;
        let record = self.table.splice(range.clone(), &spliced);
        let forwarded = self.model.replace_range(range.clone(), text);
        let echoes = self.model.take_changes();
        self.state.leave();

        if let Err(err) = forwarded {
            tracing::warn!(?range, error = %err, "model rejected edit, reverting buffer");
            self.table.revert(record);
            return Err(err);
        }

        let mut evict = touched;
        for change in echoes {
            match change {
                TreeChange::Text(edit) => {
                    tracing::trace!(range = ?edit.range, "dropping echoed model edit");
                }
                TreeChange::Structure(id) => evict.push(id),
            }
        }
        self.evict(evict);

        self.version += 1;
        let len_after = self.table.len();
        if let Some(bracket) = self.bracket.as_mut() {
            bracket.record(
                TextDeltaEdit {
                    start: range.start,
                    deleted_text: record.removed_text,
                    inserted_text: spliced,
                },
                EditOrigin::View,
                len_after,
            );
        }
        // The model already holds the edit, so a disagreement cannot be reverted.
        match self.resolve_paragraphs() {
            Err(OutlineError::OutOfSync { range: chars }) => {
                tracing::warn!(
                    ?range,
                    ?chars,
                    "model split the edit differently, resynchronizing"
                );
                self.resync()
            }
            resolved => resolved,
        }
    }

    // ---------------------------------------------------------------------
    // Model → view
    // ---------------------------------------------------------------------

    /// Apply a text edit that originated in the model.
    pub fn apply_tree_edit(&mut self, edit: TreeEdit) -> Result<()> {
        self.apply_tree_change(TreeChange::Text(edit))
    }

    /// Apply a change notification that originated in the model.
    ///
    /// Inside an open bracket the change is queued. While a view edit is being forwarded
    /// the change is an echo: text is dropped, structure changes still evict metadata.
    pub fn apply_tree_change(&mut self, change: TreeChange) -> Result<()> {
        match self.state {
            SyncState::ApplyingFromView => {
                match change {
                    TreeChange::Text(edit) => {
                        tracing::trace!(range = ?edit.range, "dropping echoed model edit");
                    }
                    TreeChange::Structure(id) => self.evict(vec![id]),
                }
                Ok(())
            }
            SyncState::ApplyingFromModel => {
                self.pending.push_back(change);
                Ok(())
            }
            SyncState::Idle if self.edit_depth > 0 => {
                self.pending.push_back(change);
                Ok(())
            }
            SyncState::Idle => {
                self.begin_edit();
                self.pending.push_back(change);
                self.end_edit()
            }
        }
    }

    /// Drain the model's change notifications and apply them as one bracket.
    pub fn sync_from_model(&mut self) -> Result<()> {
        let changes = self.model.take_changes();
        if changes.is_empty() {
            return Ok(());
        }
        self.begin_edit();
        self.pending.extend(changes);
        self.end_edit()
    }

    /// Run `f` against the model inside one edit bracket (and so one undo group), then
    /// splice its changes into the buffer.
    pub fn perform_model_edit<R>(&mut self, f: impl FnOnce(&mut M) -> Result<R>) -> Result<R> {
        if !self.state.is_idle() {
            return Err(OutlineError::Reentrant {
                active: self.state.as_str(),
                attempted: SyncState::ApplyingFromModel.as_str(),
            });
        }
        self.begin_edit();
        let result = f(&mut self.model);
        let changes = self.model.take_changes();
        self.pending.extend(changes);
        let closed = self.end_edit();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(err), _) | (Ok(_), Err(err)) => Err(err),
        }
    }

    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        while let Some(change) = self.pending.pop_front() {
            match change {
                TreeChange::Text(edit) => self.splice_from_model(edit)?,
                TreeChange::Structure(id) => self.evict(vec![id]),
            }
        }
        self.resolve_paragraphs()
    }

    fn splice_from_model(&mut self, edit: TreeEdit) -> Result<()> {
        if edit.range.start > edit.range.end || edit.range.end > self.table.len() {
            tracing::warn!(
                range = ?edit.range,
                len = self.table.len(),
                "model edit outside buffer, resynchronizing"
            );
            self.pending.clear();
            return self.resync();
        }

        self.state.enter(SyncState::ApplyingFromModel)?;
        let touched = self
            .table
            .ids(self.table.paragraph_indices_for(edit.range.clone()));
        let record = self.table.splice(edit.range.clone(), &edit.text);
        self.state.leave();

        self.evict(touched);
        self.version += 1;
        let len_after = self.table.len();
        if let Some(bracket) = self.bracket.as_mut() {
            bracket.record(
                TextDeltaEdit {
                    start: edit.range.start,
                    deleted_text: record.removed_text,
                    inserted_text: edit.text,
                },
                EditOrigin::Model,
                len_after,
            );
        }
        Ok(())
    }

    /// Rebuild the buffer from the model's displayed text and drop every cached entry.
    pub fn resync(&mut self) -> Result<()> {
        let text = self.model.displayed_text();
        let old_len = self.table.len();
        let old_text = self.table.text();
        self.table = ParagraphTable::from_text(&text);
        self.cache.get_mut().clear();
        self.version += 1;
        let len_after = self.table.len();
        if let Some(bracket) = self.bracket.as_mut() {
            bracket.record(
                TextDeltaEdit {
                    start: 0,
                    deleted_text: old_text,
                    inserted_text: text,
                },
                EditOrigin::Model,
                len_after,
            );
        }
        tracing::warn!(old_len, new_len = len_after, "storage resynchronized from model");
        self.resolve_paragraphs()
    }

    /// Resolve paragraph slots that splices left unverified, one model query per run.
    fn resolve_paragraphs(&mut self) -> Result<()> {
        for run in self.table.unverified_runs() {
            let chars = self.table.char_range_of(run.clone());
            let ids = self.model.node_ids_in_range(chars.clone());
            if ids.len() != run.len() {
                tracing::warn!(
                    ?chars,
                    expected = run.len(),
                    actual = ids.len(),
                    "paragraph table out of sync"
                );
                return Err(OutlineError::OutOfSync { range: chars });
            }
            self.table.assign(run, &ids);
        }
        Ok(())
    }

    fn evict(&mut self, ids: Vec<NodeId>) {
        if ids.is_empty() {
            return;
        }
        // Rendering metadata changed even when nothing was cached.
        self.version += 1;
        let cache = self.cache.get_mut();
        let evicted: Vec<NodeId> = ids.into_iter().filter(|&id| cache.evict([id]) > 0).collect();
        if evicted.is_empty() {
            return;
        }
        tracing::trace!(count = evicted.len(), "evicted node metadata");
        if let Some(bracket) = self.bracket.as_mut() {
            bracket.evicted.extend(evicted);
        }
    }

    // ---------------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------------

    /// Drop every cached metadata entry when `generation` differs from the one the cache
    /// was filled under.
    pub fn sync_generation(&mut self, generation: (u64, u64)) {
        if self.metadata_generation != Some(generation) {
            if self.metadata_generation.is_some() {
                tracing::debug!(?generation, "style generation changed, clearing metadata");
            }
            self.cache.get_mut().clear();
            self.metadata_generation = Some(generation);
        }
    }

    /// The metadata cache.
    pub fn metadata_cache(&self) -> Ref<'_, NodeMetadataCache> {
        self.cache.borrow()
    }

    /// Metadata of the paragraph at `location`. On a miss every paragraph covered by
    /// `requested_range` is fetched in the same round trip.
    pub fn metadata_for_paragraph_at(
        &self,
        location: usize,
        requested_range: Range<usize>,
    ) -> Option<Rc<NodeMetadata>> {
        let index = self.table.paragraph_index_at(location);
        let id = self.table.id(index)?;
        if let Some(hit) = self.cache.borrow().get(id) {
            return Some(hit);
        }
        let indices = self.table.paragraph_indices_for(requested_range);
        let mut ids = self.table.ids(indices);
        if !ids.contains(&id) {
            ids.push(id);
        }
        let mut cache = self.cache.borrow_mut();
        cache.ensure(&ids, &self.model);
        cache.get(id)
    }

    /// Metadata of the paragraph at `location`, fetching a batch window on a miss.
    pub fn metadata_at(&self, location: usize) -> Option<Rc<NodeMetadata>> {
        let index = self.table.paragraph_index_at(location);
        let last = (index + self.batch_size).min(self.table.paragraph_count());
        let window = self.table.char_range_of(index..last);
        self.metadata_for_paragraph_at(location, window)
    }

    /// Metadata of a node that currently has a paragraph.
    pub fn metadata_for_node(&self, id: NodeId) -> Option<Rc<NodeMetadata>> {
        let index = self.table.index_of(id)?;
        let location = self.table.paragraph_range(index).start;
        self.metadata_at(location)
    }

    /// Metadata of every paragraph intersecting `range`, fetched in one round trip.
    pub fn metadata_in_range(&self, range: Range<usize>) -> Vec<Rc<NodeMetadata>> {
        let ids = self.node_ids_in_range(range);
        let mut cache = self.cache.borrow_mut();
        cache.ensure(&ids, &self.model);
        ids.iter().filter_map(|&id| cache.get(id)).collect()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Buffer length in characters.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// `true` if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The whole buffer.
    pub fn text(&self) -> String {
        self.table.text()
    }

    /// Text of a range (clamped).
    pub fn text_in_range(&self, range: Range<usize>) -> String {
        self.table.slice(range)
    }

    /// Number of paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.table.paragraph_count()
    }

    /// Index of the paragraph containing `location`.
    pub fn paragraph_index_at(&self, location: usize) -> usize {
        self.table.paragraph_index_at(location)
    }

    /// Character range of a paragraph, terminator included.
    pub fn paragraph_range(&self, index: usize) -> Range<usize> {
        self.table.paragraph_range(index)
    }

    /// Character range of the paragraphs covered by `range`.
    pub fn paragraph_range_for(&self, range: Range<usize>) -> Range<usize> {
        self.table.paragraph_range_for(range)
    }

    /// Character range of a paragraph body.
    pub fn body_range(&self, index: usize) -> Range<usize> {
        self.table.body_range(index)
    }

    /// Node rendered by the paragraph containing `location`.
    pub fn node_at(&self, location: usize) -> Option<NodeId> {
        self.table.id(self.table.paragraph_index_at(location))
    }

    /// Nodes of the paragraphs covered by `range`, in order.
    pub fn node_ids_in_range(&self, range: Range<usize>) -> Vec<NodeId> {
        self.table.ids(self.table.paragraph_indices_for(range))
    }

    /// Paragraph index of a node.
    pub fn paragraph_index_of(&self, id: NodeId) -> Option<usize> {
        self.table.index_of(id)
    }

    /// Character range of a node's paragraph.
    pub fn paragraph_range_of(&self, id: NodeId) -> Option<Range<usize>> {
        self.table.index_of(id).map(|i| self.table.paragraph_range(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryOutline;
    use std::cell::RefCell as StdRefCell;

    fn storage(text: &str) -> OutlineTextStorage<MemoryOutline> {
        OutlineTextStorage::new(MemoryOutline::from_outline_text(text)).unwrap()
    }

    #[test]
    fn test_projection_matches_model() {
        let storage = storage("a\n\tb\nc\n");
        assert_eq!(storage.text(), "a\nb\nc\n");
        assert_eq!(storage.paragraph_count(), 3);
        assert_eq!(storage.node_at(2), storage.model().find("b"));
    }

    #[test]
    fn test_view_edit_forwards_once() {
        let mut storage = storage("one\ntwo\n");
        storage.replace_range(0..3, "ONE").unwrap();
        assert_eq!(storage.model().replace_range_calls(), 1);
        assert_eq!(storage.model().displayed_text(), "ONE\ntwo\n");
        assert_eq!(storage.pending_tree_edits(), 0);
    }

    #[test]
    fn test_model_edit_is_not_forwarded() {
        let mut storage = storage("one\ntwo\n");
        let two = storage.model().find("two").unwrap();
        storage
            .perform_model_edit(|m| m.set_body(two, "deux"))
            .unwrap();
        assert_eq!(storage.text(), "one\ndeux\n");
        assert_eq!(storage.model().replace_range_calls(), 0);
    }

    #[test]
    fn test_rejected_edit_reverts() {
        let mut outline = MemoryOutline::from_outline_text("one\ntwo\n");
        outline.fail_next_edit();
        let mut storage = OutlineTextStorage::new(outline).unwrap();
        let before = storage.version();
        let changes = Rc::new(StdRefCell::new(0));
        let seen = changes.clone();
        storage.subscribe(move |_| *seen.borrow_mut() += 1);

        assert!(storage.replace_range(0..3, "x").is_err());
        assert_eq!(storage.text(), "one\ntwo\n");
        assert_eq!(storage.model().displayed_text(), "one\ntwo\n");
        assert_eq!(storage.version(), before);
        assert!(storage.paragraphs().is_verified());
        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn test_split_paragraph_resolves_new_node() {
        let mut storage = storage("one\ntwo\n");
        storage.replace_range(3..3, "\nnew").unwrap();
        assert_eq!(storage.text(), "one\nnew\ntwo\n");
        assert_eq!(storage.node_at(4), storage.model().find("new"));
        assert!(storage.paragraphs().is_verified());
    }

    #[test]
    fn test_end_of_buffer_edit_keeps_terminator() {
        let mut storage = storage("one\n");
        storage.replace_range(0..4, "").unwrap();
        assert_eq!(storage.text(), "\n");
        assert_eq!(storage.model().displayed_text(), "\n");
    }

    #[test]
    fn test_typing_into_empty_document() {
        let mut storage = OutlineTextStorage::new(MemoryOutline::new()).unwrap();
        assert_eq!(storage.node_at(0), Some(storage.model().root()));
        storage.replace_range(0..0, "hello").unwrap();
        assert_eq!(storage.text(), "hello\n");
        assert_eq!(storage.node_at(0), storage.model().find("hello"));
    }

    #[test]
    fn test_reentrant_view_edit_is_rejected() {
        let mut storage = storage("one\n");
        storage.state = SyncState::ApplyingFromModel;
        assert!(matches!(
            storage.replace_range(0..0, "x"),
            Err(OutlineError::Reentrant { .. })
        ));
    }

    #[test]
    fn test_crlf_is_normalized() {
        let mut storage = storage("one\n");
        storage.replace_range(3..3, "\r\ntwo").unwrap();
        assert_eq!(storage.text(), "one\ntwo\n");
        assert_eq!(storage.model().displayed_text(), "one\ntwo\n");
    }
}
