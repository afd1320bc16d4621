//! Outline editor facade.
//!
//! [`OutlineEditor`] wires the text storage, layout engine, selection, drag controller,
//! pasteboard and stylesheet reloading together the way a host view drives them: pointer
//! events in, edits and geometry out.
//!
//! # Example
//!
//! ```rust
//! use outline_core::{MemoryOutline, OutlineEditor, Point};
//!
//! let model = MemoryOutline::from_outline_text("Inbox:\n\t- milk\n");
//! let mut editor = OutlineEditor::with_defaults(model, 400.0).unwrap();
//!
//! editor.set_selection(0..0);
//! editor.replace_selection("My ").unwrap();
//! assert_eq!(editor.storage().text(), "My Inbox:\n- milk\n");
//!
//! let geometry = editor.layout().paragraph_geometry(1).unwrap().geometry;
//! let center = Point::new(geometry.item_rect.mid_x(), geometry.item_rect.mid_y());
//! assert!(geometry.item_rect.contains(center));
//! ```

use std::ops::Range;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::context::EditorContext;
use crate::debounce::Debouncer;
use crate::drag::{
    DragController, DragOperation, DragState, DropOutcome, PointerUp, top_level_nodes,
};
use crate::error::Result;
use crate::geometry::Point;
use crate::layout::{Layout, LayoutEngine};
use crate::line_ending::normalize_line_endings;
use crate::metadata::LinkTarget;
use crate::model::{DONE_ATTRIBUTE, DocumentModel, NodeId};
use crate::pasteboard::{ItemPayload, Pasteboard};
use crate::selection::{SelectionLevel, SelectionState};
use crate::settings::{EditorSettings, Modifiers};
use crate::style::StyleSheet;
use crate::text_storage::OutlineTextStorage;

/// What a pointer-down did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerDown {
    /// Pressed a handle; a drag may follow.
    ArmedHandle(NodeId),
    /// Clicked a task marker and toggled its `done` attribute.
    ToggledDone(NodeId),
    /// Clicked a filter or URL link; the host decides what to do with it.
    Link(LinkTarget),
    /// Placed the caret.
    Caret(usize),
    /// Nothing to hit (empty layout).
    Nothing,
}

/// Outline editor state for one document.
pub struct OutlineEditor<M: DocumentModel> {
    storage: OutlineTextStorage<M>,
    context: EditorContext,
    stylesheet: Rc<StyleSheet>,
    layout: LayoutEngine,
    selection: SelectionState,
    drag: DragController,
    reload: Debouncer,
    pending_stylesheet: Option<StyleSheet>,
    document_id: String,
}

impl<M: DocumentModel> OutlineEditor<M> {
    /// Create an editor for `model`.
    pub fn new(
        model: M,
        stylesheet: StyleSheet,
        settings: EditorSettings,
        container_width: f32,
        document_id: impl Into<String>,
    ) -> Result<Self> {
        let stylesheet = Rc::new(stylesheet);
        let reload = Debouncer::new(Duration::from_millis(settings.stylesheet_reload_delay_ms));
        let drag = DragController::new(settings.minimum_drag_distance);
        let batch_size = settings.metadata_batch_size;
        let context = EditorContext::new(stylesheet.clone(), settings);

        let mut storage = OutlineTextStorage::new(model)?;
        storage.set_metadata_batch_size(batch_size);
        storage.sync_generation(context.generation());
        let selection = SelectionState::caret(&storage, 0);

        Ok(Self {
            storage,
            context,
            stylesheet,
            layout: LayoutEngine::new(container_width),
            selection,
            drag,
            reload,
            pending_stylesheet: None,
            document_id: document_id.into(),
        })
    }

    /// Editor with the standard stylesheet and default settings.
    pub fn with_defaults(model: M, container_width: f32) -> Result<Self> {
        Self::new(
            model,
            StyleSheet::standard(),
            EditorSettings::default(),
            container_width,
            "untitled",
        )
    }

    /// The text storage.
    pub fn storage(&self) -> &OutlineTextStorage<M> {
        &self.storage
    }

    /// Mutable text storage, for hosts that drive edits directly.
    pub fn storage_mut(&mut self) -> &mut OutlineTextStorage<M> {
        &mut self.storage
    }

    /// The document model.
    pub fn model(&self) -> &M {
        self.storage.model()
    }

    /// The editor context.
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// Document identifier written into pasteboard payloads.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// The selection.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// The drag controller.
    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    /// Selected character range.
    pub fn selected_range(&self) -> Range<usize> {
        self.selection.range(&self.storage)
    }

    /// Nodes covered by the selection.
    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.selection.nodes(&self.storage)
    }

    // ---------------------------------------------------------------------
    // Layout
    // ---------------------------------------------------------------------

    /// Resize the text container.
    pub fn set_container_width(&mut self, width: f32) {
        self.layout.set_container_width(width);
    }

    /// The current layout pass.
    pub fn layout(&mut self) -> &Layout {
        self.storage.sync_generation(self.context.generation());
        self.layout.layout(&self.storage, &self.context)
    }

    /// Replace settings; everything derived from them is invalidated.
    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.drag.set_minimum_distance(settings.minimum_drag_distance);
        self.reload
            .set_delay(Duration::from_millis(settings.stylesheet_reload_delay_ms));
        self.storage
            .set_metadata_batch_size(settings.metadata_batch_size);
        self.context.set_settings(settings);
    }

    // ---------------------------------------------------------------------
    // Stylesheet reload
    // ---------------------------------------------------------------------

    /// A new stylesheet is available (e.g. the file changed on disk). It is applied by
    /// [`tick`](Self::tick) once changes stop arriving for the reload delay.
    pub fn stylesheet_changed(&mut self, stylesheet: StyleSheet, now: Instant) {
        self.pending_stylesheet = Some(stylesheet);
        self.reload.trigger(now);
    }

    /// Drive deferred work. Returns `true` when a stylesheet was applied.
    ///
    /// A reload that comes due while an edit bracket is open is pushed back.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.reload.poll(now) {
            return false;
        }
        if self.storage.is_editing() {
            tracing::debug!("edit in progress, deferring stylesheet reload");
            self.reload.defer(now);
            return false;
        }
        let Some(stylesheet) = self.pending_stylesheet.take() else {
            return false;
        };
        self.stylesheet.replace_with(stylesheet);
        self.storage.sync_generation(self.context.generation());
        self.layout.invalidate();
        tracing::debug!(generation = ?self.context.generation(), "stylesheet reloaded");
        true
    }

    // ---------------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------------

    /// Replace the selection with `text` and leave a caret after it.
    pub fn replace_selection(&mut self, text: &str) -> Result<()> {
        let range = self.selected_range();
        self.storage.replace_range(range.clone(), text)?;
        let caret = range.start + normalize_line_endings(text).chars().count();
        self.selection.select(&self.storage, caret..caret);
        Ok(())
    }

    /// Replace a range of the buffer.
    pub fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        self.storage.replace_range(range, text)
    }

    /// Run a structural edit against the model as one bracket.
    pub fn perform_model_edit<R>(&mut self, f: impl FnOnce(&mut M) -> Result<R>) -> Result<R> {
        self.storage.perform_model_edit(f)
    }

    /// Apply changes the model made on its own.
    pub fn sync_from_model(&mut self) -> Result<()> {
        self.storage.sync_from_model()
    }

    /// Expand or collapse a node that has children.
    pub fn toggle_fold(&mut self, node: NodeId) -> Result<bool> {
        let model = self.storage.model();
        if model.first_child(node).is_none() {
            return Ok(false);
        }
        let expanded = !model.is_expanded(node);
        self.storage
            .perform_model_edit(|m| m.set_expanded(node, expanded))?;
        Ok(true)
    }

    /// Toggle the `done` attribute of a node.
    pub fn toggle_done(&mut self, node: NodeId) -> Result<()> {
        let done = self.storage.model().attribute(node, DONE_ATTRIBUTE).is_some();
        self.storage.perform_model_edit(|m| {
            m.set_attribute(node, DONE_ATTRIBUTE, (!done).then_some(""))
        })
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Select a range.
    pub fn set_selection(&mut self, range: Range<usize>) {
        self.selection.select(&self.storage, range);
    }

    /// Grow the selection one rung.
    pub fn expand_selection(&mut self) -> Option<SelectionLevel> {
        self.selection.expand(&self.storage)
    }

    /// Undo one expansion.
    pub fn contract_selection(&mut self) -> bool {
        self.selection.contract(&self.storage)
    }

    // ---------------------------------------------------------------------
    // Pointer
    // ---------------------------------------------------------------------

    /// Pointer pressed at `point`.
    pub fn pointer_down(&mut self, point: Point) -> Result<PointerDown> {
        self.storage.sync_generation(self.context.generation());
        let Some(pick) = self.layout.layout(&self.storage, &self.context).pick(point) else {
            return Ok(PointerDown::Nothing);
        };

        if self.drag.pointer_down(&pick)
            && let Some(node) = pick.node
        {
            return Ok(PointerDown::ArmedHandle(node));
        }
        match (pick.link, pick.node) {
            (Some(LinkTarget::ToggleDone(_)), Some(node)) => {
                self.toggle_done(node)?;
                Ok(PointerDown::ToggledDone(node))
            }
            (Some(link), _) => Ok(PointerDown::Link(link)),
            (None, _) => {
                self.selection
                    .select(&self.storage, pick.character_index..pick.character_index);
                Ok(PointerDown::Caret(pick.character_index))
            }
        }
    }

    /// Pointer moved while pressed. Extends the selection, or drives a handle drag.
    pub fn pointer_dragged(&mut self, point: Point, modifiers: Modifiers) -> DragOperation {
        self.storage.sync_generation(self.context.generation());
        let selected = self.selection.nodes(&self.storage);
        let layout = self.layout.layout(&self.storage, &self.context);

        if matches!(self.drag.state(), DragState::Idle) {
            let index = layout.char_index_at_point(point);
            self.selection.extend_to(&self.storage, index);
            return DragOperation::None;
        }
        if !self.drag.pointer_dragged(&self.storage, point, &selected) {
            return DragOperation::None;
        }
        let force_on = self.context.settings().force_on_modifier;
        self.drag
            .drag_over(&self.storage, layout, point, modifiers, force_on)
    }

    /// Pointer released. A handle click toggles folding; a drop selects what moved.
    pub fn pointer_up(&mut self) -> Result<PointerUp> {
        let result = self.drag.pointer_up(&mut self.storage)?;
        match &result {
            PointerUp::HandleClick(node) => {
                self.toggle_fold(*node)?;
            }
            PointerUp::Dropped(DropOutcome::Moved(nodes) | DropOutcome::Copied(nodes)) => {
                self.select_nodes(nodes);
            }
            PointerUp::Dropped(DropOutcome::NoOperation) | PointerUp::Ignored => {}
        }
        Ok(result)
    }

    /// Abandon a drag in progress.
    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    fn select_nodes(&mut self, nodes: &[NodeId]) {
        let ranges: Vec<Range<usize>> = nodes
            .iter()
            .filter_map(|&n| self.storage.paragraph_range_of(n))
            .collect();
        let start = ranges.iter().map(|r| r.start).min();
        let end = ranges.iter().map(|r| r.end.saturating_sub(1)).max();
        if let (Some(start), Some(end)) = (start, end) {
            self.selection.select(&self.storage, start..end);
        }
    }

    // ---------------------------------------------------------------------
    // Pasteboard
    // ---------------------------------------------------------------------

    /// Write the selected branches to `pasteboard`.
    pub fn copy_selection(&self, pasteboard: &mut Pasteboard) -> Result<()> {
        let nodes = top_level_nodes(self.storage.model(), &self.selected_nodes());
        let payload = ItemPayload::capture(self.storage.model(), &nodes, Some(&self.document_id))?;
        pasteboard.write_items(&payload)
    }

    /// Insert the pasteboard's items after the node at the selection head. Returns the
    /// new top-level nodes.
    pub fn paste(&mut self, pasteboard: &Pasteboard) -> Result<Vec<NodeId>> {
        let Some(content) = pasteboard.read()? else {
            return Ok(Vec::new());
        };
        let payload = content.into_payload();
        let model = self.storage.model();
        let head = self.selection.head().node;
        let (parent, next_sibling) = match model.parent(head) {
            Some(parent) => (parent, model.next_sibling(head)),
            None => (model.root(), None),
        };
        let inserted = self.storage.perform_model_edit(|m| {
            let ids = m.deserialize_branches(&payload.items)?;
            m.move_branches(&ids, parent, next_sibling)?;
            Ok(ids)
        })?;
        self.select_nodes(&inserted);
        Ok(inserted)
    }
}

impl<M: DocumentModel + std::fmt::Debug> std::fmt::Debug for OutlineEditor<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutlineEditor")
            .field("storage", &self.storage)
            .field("document_id", &self.document_id)
            .field("selection", &self.selection)
            .field("drag", &self.drag.state())
            .finish_non_exhaustive()
    }
}
