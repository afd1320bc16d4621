//! Handle-driven drag and drop of branches.
//!
//! `Idle → Armed → Dragging → Dropped | Cancelled`, then back to `Idle`. Nothing is
//! mutated before the drop, so cancelling at any point leaves buffer, tree and selection
//! as they were. The drop itself is one [`perform_model_edit`] bracket, so it is one undo
//! group.
//!
//! [`perform_model_edit`]: crate::text_storage::OutlineTextStorage::perform_model_edit

use crate::error::Result;
use crate::geometry::Point;
use crate::hit_test::ItemPick;
use crate::layout::Layout;
use crate::model::{DocumentModel, NodeId};
use crate::pasteboard::ItemPayload;
use crate::settings::{ModifierKey, Modifiers};
use crate::text_storage::OutlineTextStorage;

/// Where a drop lands relative to its target item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropLocation {
    /// Before the target, as a sibling.
    Above,
    /// As the first child of the target.
    On,
    /// After the target, as a sibling.
    Below,
}

/// A classified drop position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DropTarget {
    /// Item under the pointer.
    pub target: NodeId,
    /// Relative location.
    pub location: DropLocation,
}

impl DropTarget {
    /// Resolve to `(parent, next_sibling)`. `None` when the target has no parent to
    /// insert into, or cannot take children for [`DropLocation::On`].
    pub fn resolve<M: DocumentModel + ?Sized>(
        &self,
        model: &M,
    ) -> Option<(NodeId, Option<NodeId>)> {
        match self.location {
            DropLocation::On => model
                .can_have_children(self.target)
                .then(|| (self.target, model.first_child(self.target))),
            DropLocation::Above => Some((model.parent(self.target)?, Some(self.target))),
            DropLocation::Below => Some((
                model.parent(self.target)?,
                model.next_sibling(self.target),
            )),
        }
    }
}

/// Operation a drop would perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragOperation {
    /// The drop is rejected.
    None,
    /// Branches move to the new position.
    Move,
    /// Copies are inserted at the new position.
    Copy,
}

/// Operations a drag source allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DragOperationMask {
    /// Copy allowed.
    pub copy: bool,
    /// Move allowed.
    pub move_items: bool,
    /// Delete (drag to trash) allowed.
    pub delete: bool,
}

/// What the source permits: everything within the application, copy and delete outside.
pub fn source_operation_mask(within_application: bool) -> DragOperationMask {
    DragOperationMask {
        copy: true,
        move_items: within_application,
        delete: true,
    }
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// Nodes of this document.
    Local(Vec<NodeId>),
    /// Items from another document (or from outside the application).
    Foreign(ItemPayload),
}

impl DragSource {
    /// Interpret a payload: references into `document` whose nodes still exist become
    /// local, everything else is foreign.
    pub fn from_payload<M: DocumentModel + ?Sized>(
        payload: ItemPayload,
        document: &str,
        model: &M,
    ) -> Self {
        if payload.is_from(document) && payload.nodes.iter().all(|&id| model.kind(id).is_some()) {
            DragSource::Local(payload.nodes)
        } else {
            DragSource::Foreign(payload)
        }
    }
}

/// A validated drop proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropProposal {
    /// Classified target.
    pub target: DropTarget,
    /// Resolved parent.
    pub parent: NodeId,
    /// Resolved next sibling.
    pub next_sibling: Option<NodeId>,
    /// Operation the drop would perform.
    pub operation: DragOperation,
}

/// Result of a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Branches moved.
    Moved(Vec<NodeId>),
    /// Copies inserted; the new top-level ids.
    Copied(Vec<NodeId>),
    /// Nothing happened.
    NoOperation,
}

/// Drag state.
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    /// No pointer interaction.
    Idle,
    /// Pointer down on a handle, not yet past the drag threshold.
    Armed {
        /// Pick at pointer-down.
        pick: ItemPick,
        /// Node under the handle.
        node: NodeId,
    },
    /// Dragging.
    Dragging {
        /// What is dragged.
        source: DragSource,
        /// Last proposal, if the pointer is over a legal target.
        proposal: Option<DropProposal>,
    },
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerUp {
    /// Released before the threshold: a click on the handle of this node.
    HandleClick(NodeId),
    /// Released while dragging.
    Dropped(DropOutcome),
    /// Nothing was in progress.
    Ignored,
}

/// Classify the item under `point`. The force-on modifier drops on it; otherwise the
/// upper half of its item rect means above and the lower half below.
pub fn classify_drop_target(
    layout: &Layout,
    point: Point,
    modifiers: Modifiers,
    force_on: ModifierKey,
) -> Option<DropTarget> {
    let pick = layout.pick(point)?;
    let target = pick.node?;
    let rect = layout.item_geometry(target)?.item_rect;
    let location = if modifiers.contains(force_on) {
        DropLocation::On
    } else if point.y < rect.mid_y() {
        DropLocation::Above
    } else {
        DropLocation::Below
    };
    Some(DropTarget { target, location })
}

/// Decide what dropping `source` at `drop` would do.
///
/// Local nodes that would end up inside themselves, or that include the target or one of
/// its ancestors, can only be copied. Dropping nodes where they already are is rejected.
pub fn validate_drop<M: DocumentModel + ?Sized>(
    model: &M,
    source: &DragSource,
    drop: &DropTarget,
    modifiers: Modifiers,
) -> DragOperation {
    let Some((parent, next_sibling)) = drop.resolve(model) else {
        return DragOperation::None;
    };
    let nodes = match source {
        DragSource::Foreign(_) => return DragOperation::Copy,
        DragSource::Local(nodes) => nodes,
    };
    if nodes.is_empty() {
        return DragOperation::None;
    }
    if nodes
        .iter()
        .any(|&node| node == parent || model.contains(node, parent))
    {
        return DragOperation::Copy;
    }
    if is_current_position(model, nodes, parent, next_sibling) {
        return DragOperation::None;
    }
    if nodes
        .iter()
        .any(|&node| node == drop.target || model.contains(node, drop.target))
    {
        return DragOperation::Copy;
    }
    if modifiers.option {
        DragOperation::Copy
    } else {
        DragOperation::Move
    }
}

/// `true` if `nodes` already sit, consecutively and in order, at `(parent, next_sibling)`.
fn is_current_position<M: DocumentModel + ?Sized>(
    model: &M,
    nodes: &[NodeId],
    parent: NodeId,
    next_sibling: Option<NodeId>,
) -> bool {
    if nodes.iter().any(|&n| model.parent(n) != Some(parent)) {
        return false;
    }
    if nodes
        .windows(2)
        .any(|pair| model.next_sibling(pair[0]) != Some(pair[1]))
    {
        return false;
    }
    let after = nodes.last().and_then(|&last| model.next_sibling(last));
    next_sibling == after || next_sibling.is_some_and(|n| nodes.contains(&n))
}

/// Keep only nodes none of whose ancestors are also in the list, preserving order.
pub fn top_level_nodes<M: DocumentModel + ?Sized>(model: &M, nodes: &[NodeId]) -> Vec<NodeId> {
    nodes
        .iter()
        .copied()
        .filter(|&n| !nodes.iter().any(|&other| other != n && model.contains(other, n)))
        .collect()
}

/// Drag controller.
#[derive(Debug, Clone)]
pub struct DragController {
    state: DragState,
    minimum_distance: f32,
}

impl DragController {
    /// Create an idle controller with a drag threshold in points.
    pub fn new(minimum_distance: f32) -> Self {
        Self {
            state: DragState::Idle,
            minimum_distance,
        }
    }

    /// Current state.
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// `true` while dragging.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Update the drag threshold.
    pub fn set_minimum_distance(&mut self, minimum_distance: f32) {
        self.minimum_distance = minimum_distance;
    }

    /// Pointer pressed. Arms the controller when the press lands in a handle.
    pub fn pointer_down(&mut self, pick: &ItemPick) -> bool {
        let Some(node) = pick.node.filter(|_| pick.handle_contains_point) else {
            return false;
        };
        tracing::debug!(?node, "drag armed");
        self.state = DragState::Armed {
            pick: pick.clone(),
            node,
        };
        true
    }

    /// Pointer moved while pressed. Past the threshold an armed drag starts, dragging
    /// the selected nodes when the pressed node is among them.
    pub fn pointer_dragged<M: DocumentModel>(
        &mut self,
        storage: &OutlineTextStorage<M>,
        point: Point,
        selected: &[NodeId],
    ) -> bool {
        let DragState::Armed { pick, node } = &self.state else {
            return self.is_dragging();
        };
        if pick.point.distance_to(point) < self.minimum_distance {
            return false;
        }
        let nodes = if selected.contains(node) {
            top_level_nodes(storage.model(), selected)
        } else {
            vec![*node]
        };
        tracing::debug!(count = nodes.len(), "drag started");
        self.begin(DragSource::Local(nodes));
        true
    }

    /// Start dragging `source` directly (e.g. a drag entering from elsewhere).
    pub fn begin(&mut self, source: DragSource) {
        self.state = DragState::Dragging {
            source,
            proposal: None,
        };
    }

    /// Update the drop proposal for the pointer position.
    pub fn drag_over<M: DocumentModel>(
        &mut self,
        storage: &OutlineTextStorage<M>,
        layout: &Layout,
        point: Point,
        modifiers: Modifiers,
        force_on: ModifierKey,
    ) -> DragOperation {
        let DragState::Dragging { source, proposal } = &mut self.state else {
            return DragOperation::None;
        };
        let model = storage.model();
        let resolved = classify_drop_target(layout, point, modifiers, force_on)
            .and_then(|target| target.resolve(model).map(|(p, n)| (target, p, n)));

        *proposal = resolved.and_then(|(target, parent, next_sibling)| {
            let operation = validate_drop(model, source, &target, modifiers);
            (operation != DragOperation::None).then_some(DropProposal {
                target,
                parent,
                next_sibling,
                operation,
            })
        });
        proposal
            .as_ref()
            .map_or(DragOperation::None, |p| p.operation)
    }

    /// The current proposal.
    pub fn proposal(&self) -> Option<&DropProposal> {
        match &self.state {
            DragState::Dragging { proposal, .. } => proposal.as_ref(),
            _ => None,
        }
    }

    /// Abandon the interaction without touching anything.
    pub fn cancel(&mut self) {
        if !matches!(self.state, DragState::Idle) {
            tracing::debug!("drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// Pointer released.
    pub fn pointer_up<M: DocumentModel>(
        &mut self,
        storage: &mut OutlineTextStorage<M>,
    ) -> Result<PointerUp> {
        match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Idle => Ok(PointerUp::Ignored),
            DragState::Armed { node, .. } => Ok(PointerUp::HandleClick(node)),
            DragState::Dragging { source, proposal } => {
                let outcome = match proposal {
                    Some(proposal) => perform_drop(storage, source, &proposal)?,
                    None => DropOutcome::NoOperation,
                };
                Ok(PointerUp::Dropped(outcome))
            }
        }
    }
}

/// Execute a proposal inside one storage bracket.
pub fn perform_drop<M: DocumentModel>(
    storage: &mut OutlineTextStorage<M>,
    source: DragSource,
    proposal: &DropProposal,
) -> Result<DropOutcome> {
    let DropProposal {
        parent,
        next_sibling,
        operation,
        ..
    } = *proposal;
    if operation == DragOperation::None || storage.model().kind(parent).is_none() {
        return Ok(DropOutcome::NoOperation);
    }
    let outcome = storage.perform_model_edit(|model| match (source, operation) {
        (DragSource::Local(nodes), DragOperation::Move) => {
            model.move_branches(&nodes, parent, next_sibling)?;
            Ok(DropOutcome::Moved(nodes))
        }
        (DragSource::Local(nodes), _) => {
            let copies = model.clone_nodes(&nodes)?;
            model.move_branches(&copies, parent, next_sibling)?;
            Ok(DropOutcome::Copied(copies))
        }
        (DragSource::Foreign(payload), _) => {
            let copies = model.deserialize_branches(&payload.items)?;
            model.move_branches(&copies, parent, next_sibling)?;
            Ok(DropOutcome::Copied(copies))
        }
    })?;
    tracing::debug!(?outcome, ?parent, "drop performed");
    Ok(outcome)
}
