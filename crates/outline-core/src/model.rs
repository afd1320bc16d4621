//! Document model contract.
//!
//! The document tree (node creation, mutation, undo, serialization) lives outside this
//! crate. [`DocumentModel`] is the boundary the synchronization core talks to; the
//! in-memory [`MemoryOutline`](crate::memory::MemoryOutline) implements it for tests and
//! embedders that do not bring their own engine.
//!
//! All character offsets are counted in `char`s (Unicode scalar values) of the
//! *displayed* text: one line per visible node, each terminated by `\n`.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metadata::NodeMetadata;

/// Attribute marking a task as completed.
pub const DONE_ATTRIBUTE: &str = "done";

slotmap::new_key_type! {
    /// Stable, opaque identifier of a node in the document model.
    pub struct NodeId;
}

/// Node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The (hoisted) root; never displayed as a paragraph unless the document is empty.
    Root,
    /// A project heading (`Name:`).
    Project,
    /// A task (`- body`).
    Task,
    /// Free text.
    #[default]
    Note,
}

impl NodeKind {
    /// Lowercase name used in style key paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Project => "project",
            NodeKind::Task => "task",
            NodeKind::Note => "note",
        }
    }

    /// Infer a kind from a body line using TaskPaper conventions.
    pub fn infer(body: &str) -> Self {
        if body.starts_with("- ") || body == "-" {
            NodeKind::Task
        } else if body.trim_end().ends_with(':') && !body.trim().is_empty() {
            NodeKind::Project
        } else {
            NodeKind::Note
        }
    }
}

/// A text change in the displayed buffer, expressed against the displayed text as it
/// was *before* the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEdit {
    /// Replaced character range.
    pub range: Range<usize>,
    /// Replacement text.
    pub text: String,
}

impl TreeEdit {
    /// Create an edit.
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// Replacement length in characters.
    pub fn replacement_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Change notification emitted by a document model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// The displayed text changed.
    Text(TreeEdit),
    /// A node's rendering metadata (type, depth, style, runs) may have changed without
    /// its paragraph text being edited.
    Structure(NodeId),
}

/// A detached, serializable branch (node plus descendants).
///
/// Run styles are not stored: they are derived from the body (tags, links), so a
/// round trip through this representation reproduces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    /// Node type.
    #[serde(default)]
    pub kind: NodeKind,
    /// Body text (single line).
    pub body: String,
    /// Attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Whether the branch is expanded.
    #[serde(default = "default_expanded")]
    pub expanded: bool,
    /// Children in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SerializedNode>,
}

fn default_expanded() -> bool {
    true
}

impl SerializedNode {
    /// A leaf with an inferred kind.
    pub fn leaf(body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            kind: NodeKind::infer(&body),
            body,
            attributes: BTreeMap::new(),
            expanded: true,
            children: Vec::new(),
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: SerializedNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this branch.
    pub fn branch_len(&self) -> usize {
        1 + self.children.iter().map(Self::branch_len).sum::<usize>()
    }
}

/// The document-tree engine contract consumed by the synchronization core.
///
/// Mutating methods must either fully apply or leave the model unchanged. Every change
/// to the displayed text must be reported through [`take_changes`](Self::take_changes),
/// including changes caused by [`replace_range`](Self::replace_range) (the core drops
/// those as echoes).
pub trait DocumentModel {
    /// The hoisted root. Its children are the top-level paragraphs.
    fn root(&self) -> NodeId;

    /// Create a detached node.
    fn create_node(&mut self, kind: NodeKind, body: &str) -> NodeId;

    /// Deep-clone branches into detached copies, in order.
    fn clone_nodes(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>>;

    /// Replace a node's body.
    fn set_body(&mut self, id: NodeId, body: &str) -> Result<()>;

    /// Set (`Some`) or remove (`None`) an attribute.
    fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> Result<()>;

    /// Insert detached nodes under `parent` before `next_sibling` (append when `None`).
    fn insert_children(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
        next_sibling: Option<NodeId>,
    ) -> Result<()>;

    /// Detach a node (and its branch) from its parent.
    fn remove_from_parent(&mut self, id: NodeId) -> Result<()>;

    /// Move attached or detached branches under `parent` before `next_sibling`.
    fn move_branches(
        &mut self,
        ids: &[NodeId],
        parent: NodeId,
        next_sibling: Option<NodeId>,
    ) -> Result<()>;

    /// Parent of a node, `None` for the root and detached nodes.
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Children in order.
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    /// First child.
    fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Last child.
    fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Next sibling.
    fn next_sibling(&self, id: NodeId) -> Option<NodeId>;

    /// Previous sibling.
    fn previous_sibling(&self, id: NodeId) -> Option<NodeId>;

    /// `true` if `node` is a strict descendant of `ancestor`.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `true` if the node may receive children (drop "on").
    fn can_have_children(&self, id: NodeId) -> bool;

    /// Node type.
    fn kind(&self, id: NodeId) -> Option<NodeKind>;

    /// Body text.
    fn body(&self, id: NodeId) -> Option<String>;

    /// Attribute value.
    fn attribute(&self, id: NodeId, name: &str) -> Option<String>;

    /// Whether the node's children are displayed.
    fn is_expanded(&self, id: NodeId) -> bool;

    /// Expand or collapse a node.
    fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<()>;

    /// Open an undo group. Groups nest.
    fn begin_undo_grouping(&mut self);

    /// Close the innermost undo group.
    fn end_undo_grouping(&mut self);

    /// The whole displayed text.
    fn displayed_text(&self) -> String;

    /// Apply a buffer-side edit and re-derive node boundaries (splits and merges).
    ///
    /// When `range.end` is the end of the displayed text, the model appends a `\n` to
    /// `text`, exactly like the buffer does, so both sides keep one terminator per node.
    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<()>;

    /// Ids of the displayed nodes whose paragraphs intersect `range`, in order.
    ///
    /// A zero-length range selects the paragraph containing `range.start`.
    fn node_ids_in_range(&self, range: Range<usize>) -> Vec<NodeId>;

    /// Batch metadata query. Unknown ids are skipped.
    fn metadata_for_nodes(&self, ids: &[NodeId]) -> Vec<NodeMetadata>;

    /// Ancestor → last-visible-descendant spans intersecting `range`.
    fn guide_ranges(&self, range: Range<usize>) -> Vec<Range<usize>>;

    /// Drain pending change notifications.
    fn take_changes(&mut self) -> Vec<TreeChange>;

    /// Serialize branches for the clipboard.
    fn serialize_branches(&self, ids: &[NodeId]) -> Result<Vec<SerializedNode>>;

    /// Materialize detached branches from a serialized form.
    fn deserialize_branches(&mut self, nodes: &[SerializedNode]) -> Result<Vec<NodeId>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_kind() {
        assert_eq!(NodeKind::infer("Inbox:"), NodeKind::Project);
        assert_eq!(NodeKind::infer("- buy milk"), NodeKind::Task);
        assert_eq!(NodeKind::infer("just a note"), NodeKind::Note);
        assert_eq!(NodeKind::infer(""), NodeKind::Note);
    }

    #[test]
    fn test_tree_edit_replacement_len_counts_chars() {
        let edit = TreeEdit::new(0..1, "你好");
        assert_eq!(edit.replacement_len(), 2);
    }
}
