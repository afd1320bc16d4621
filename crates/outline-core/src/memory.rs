//! In-memory document model.
//!
//! [`MemoryOutline`] is an arena-backed implementation of [`DocumentModel`]. It is small
//! enough to reason about in tests and benches, and complete enough to host a real
//! editor: buffer edits split and merge nodes, structural edits are reported as line
//! diffs, run styles are derived from the body (tags, URLs, task markers), and undo
//! groups can be rolled back.
//!
//! Every mutation recomputes the visible lines and diffs them against the previous
//! ones, so change notifications always describe the displayed text exactly.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use slotmap::SlotMap;

use crate::error::{OutlineError, Result};
use crate::metadata::{NodeMetadata, derive_run_styles};
use crate::model::{
    DONE_ATTRIBUTE, DocumentModel, NodeId, NodeKind, SerializedNode, TreeChange, TreeEdit,
};

const MAX_UNDO_GROUPS: usize = 200;

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    body: String,
    attributes: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    expanded: bool,
}

impl Node {
    fn new(kind: NodeKind, body: &str) -> Self {
        Self {
            kind,
            body: body.to_string(),
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            expanded: true,
        }
    }

    fn style_key_path(&self) -> String {
        let mut key = format!("item.{}", self.kind.as_str());
        if self.attributes.contains_key(DONE_ATTRIBUTE) {
            key.push_str(".done");
        }
        key
    }
}

/// One displayed paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    id: NodeId,
    depth: usize,
    kind: NodeKind,
    style_key_path: String,
    body: String,
    len: usize,
}

impl Line {
    fn same_text(&self, other: &Line) -> bool {
        self.id == other.id && self.body == other.body
    }
}

fn line_starts(lines: &[Line]) -> Vec<usize> {
    let mut offset = 0;
    lines
        .iter()
        .map(|line| {
            let start = offset;
            offset += line.len + 1;
            start
        })
        .collect()
}

fn line_index_at(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&s| s <= offset).saturating_sub(1)
}

fn intersects(span: &Range<usize>, range: &Range<usize>) -> bool {
    if range.is_empty() {
        span.start <= range.start && range.start < span.end
    } else {
        span.start < range.end && range.start < span.end
    }
}

/// Describe the transition between two line lists as one text edit.
///
/// A single line that kept its id is reported as an in-line edit; everything else is
/// reported as whole lines replaced by whole lines.
fn diff_lines(old: &[Line], new: &[Line]) -> Option<TreeEdit> {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a.same_text(b))
        .count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a.same_text(b))
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    if old_mid.is_empty() && new_mid.is_empty() {
        return None;
    }

    let start: usize = old[..prefix].iter().map(|l| l.len + 1).sum();
    if let ([a], [b]) = (old_mid, new_mid)
        && a.id == b.id
    {
        let a: Vec<char> = a.body.chars().collect();
        let b: Vec<char> = b.body.chars().collect();
        let p = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
        let s = a[p..]
            .iter()
            .rev()
            .zip(b[p..].iter().rev())
            .take_while(|(x, y)| x == y)
            .count();
        let text: String = b[p..b.len() - s].iter().collect();
        return Some(TreeEdit::new(start + p..start + a.len() - s, text));
    }

    let old_len: usize = old_mid.iter().map(|l| l.len + 1).sum();
    let text: String = new_mid.iter().map(|l| format!("{}\n", l.body)).collect();
    Some(TreeEdit::new(start..start + old_len, text))
}

/// Arena-backed outline document.
#[derive(Debug)]
pub struct MemoryOutline {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    lines: Vec<Line>,
    changes: Vec<TreeChange>,
    undo_depth: usize,
    undo_stack: Vec<SlotMap<NodeId, Node>>,
    group_dirty: bool,
    replace_range_calls: usize,
    fail_next_edit: bool,
}

impl Default for MemoryOutline {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOutline {
    /// Empty document (root only).
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Root, ""));
        Self {
            nodes,
            root,
            lines: Vec::new(),
            changes: Vec::new(),
            undo_depth: 0,
            undo_stack: Vec::new(),
            group_dirty: false,
            replace_range_calls: 0,
            fail_next_edit: false,
        }
    }

    /// Parse tab-indented outline text; each line becomes a node whose kind is inferred
    /// from its body. No change notifications are queued for the initial content.
    pub fn from_outline_text(text: &str) -> Self {
        let mut outline = Self::new();
        let mut stack: Vec<NodeId> = vec![outline.root];
        for raw in text.lines() {
            let depth = raw.chars().take_while(|&c| c == '\t').count();
            let body = &raw[depth..];
            let depth = (depth + 1).min(stack.len());
            stack.truncate(depth);
            let parent = stack[depth - 1];
            let id = outline.nodes.insert(Node::new(NodeKind::infer(body), body));
            outline.nodes[id].parent = Some(parent);
            outline.nodes[parent].children.push(id);
            stack.push(id);
        }
        outline.lines = outline.compute_lines();
        outline
    }

    /// Tab-indented text of the whole tree, collapsed branches included.
    pub fn to_outline_text(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self.nodes[self.root]
            .children
            .iter()
            .rev()
            .map(|&id| (id, 0))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id];
            out.extend(std::iter::repeat_n('\t', depth));
            out.push_str(&node.body);
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }

    /// First node (depth-first) whose body equals `body`.
    pub fn find(&self, body: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if id != self.root && node.body == body {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Depth below the root (top-level nodes are at depth 1).
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes.get(parent).and_then(|n| n.parent);
        }
        depth
    }

    /// Toggle the `done` attribute.
    pub fn toggle_done(&mut self, id: NodeId) -> Result<()> {
        let done = self.node(id)?.attributes.contains_key(DONE_ATTRIBUTE);
        let value = (!done).then_some("");
        self.set_attribute(id, DONE_ATTRIBUTE, value)
    }

    /// Roll back the most recent undo group. Returns `false` when there is nothing to
    /// undo or a group is still open.
    pub fn undo(&mut self) -> bool {
        if self.undo_depth > 0 {
            return false;
        }
        match self.undo_stack.pop() {
            Some(nodes) => {
                self.nodes = nodes;
                self.publish();
                true
            }
            None => false,
        }
    }

    /// Number of undo groups that can be rolled back.
    pub fn undo_group_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// How many times [`DocumentModel::replace_range`] was called.
    pub fn replace_range_calls(&self) -> usize {
        self.replace_range_calls
    }

    /// Make the next [`DocumentModel::replace_range`] fail without mutating anything.
    pub fn fail_next_edit(&mut self) {
        self.fail_next_edit = true;
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id).ok_or(OutlineError::UnknownNode(id))
    }

    fn text_len(&self) -> usize {
        self.lines.iter().map(|l| l.len + 1).sum()
    }

    fn compute_lines(&self) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = self.nodes[self.root]
            .children
            .iter()
            .rev()
            .map(|&id| (id, 1))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            lines.push(Line {
                id,
                depth,
                kind: node.kind,
                style_key_path: node.style_key_path(),
                body: node.body.clone(),
                len: node.body.chars().count(),
            });
            if node.expanded {
                stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
            }
        }
        lines
    }

    /// Recompute the visible lines and queue the notifications describing the change.
    fn publish(&mut self) {
        let new_lines = self.compute_lines();
        if let Some(edit) = diff_lines(&self.lines, &new_lines) {
            tracing::trace!(
                range = ?edit.range,
                len = edit.replacement_len(),
                "model text changed"
            );
            self.changes.push(TreeChange::Text(edit));
        }

        let old: HashMap<NodeId, &Line> = self.lines.iter().map(|l| (l.id, l)).collect();
        let mut seen = HashSet::with_capacity(new_lines.len());
        for line in &new_lines {
            seen.insert(line.id);
            if let Some(before) = old.get(&line.id)
                && (before.depth != line.depth
                    || before.kind != line.kind
                    || before.style_key_path != line.style_key_path)
            {
                self.changes.push(TreeChange::Structure(line.id));
            }
        }
        for line in &self.lines {
            if !seen.contains(&line.id) {
                self.changes.push(TreeChange::Structure(line.id));
            }
        }
        self.lines = new_lines;
    }

    fn record_undo(&mut self) {
        if self.undo_depth == 0 {
            self.push_undo_snapshot();
        }
        self.group_dirty = true;
    }

    fn push_undo_snapshot(&mut self) {
        self.undo_stack.push(self.nodes.clone());
        if self.undo_stack.len() > MAX_UNDO_GROUPS {
            self.undo_stack.remove(0);
        }
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes.get_mut(id).and_then(|n| n.parent.take())
            && let Some(parent) = self.nodes.get_mut(parent)
        {
            parent.children.retain(|&c| c != id);
        }
    }

    fn attach(&mut self, parent: NodeId, index: usize, ids: &[NodeId]) {
        for &id in ids {
            self.nodes[id].parent = Some(parent);
        }
        let children = &mut self.nodes[parent].children;
        let index = index.min(children.len());
        children.splice(index..index, ids.iter().copied());
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent].children.iter().position(|&c| c == child)
    }

    fn remove_branch(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id) {
                stack.extend(node.children);
            }
        }
    }

    /// Remove the node behind a deleted paragraph. Visible children take its place;
    /// hidden children go with it.
    fn remove_line_node(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        let index = self.child_index(parent, id).unwrap_or(0);
        self.detach(id);
        if self.nodes[id].expanded {
            let children = std::mem::take(&mut self.nodes[id].children);
            self.attach(parent, index, &children);
        }
        self.remove_branch(id);
    }

    fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let node = self.nodes[id].clone();
        let children: Vec<NodeId> = node.children.iter().map(|&c| self.deep_clone(c)).collect();
        let copy = self.nodes.insert(Node {
            parent: None,
            children: Vec::new(),
            ..node
        });
        self.attach(copy, 0, &children);
        copy
    }

    fn serialize(&self, id: NodeId) -> SerializedNode {
        let node = &self.nodes[id];
        SerializedNode {
            kind: node.kind,
            body: node.body.clone(),
            attributes: node.attributes.clone(),
            expanded: node.expanded,
            children: node.children.iter().map(|&c| self.serialize(c)).collect(),
        }
    }

    fn materialize(&mut self, node: &SerializedNode) -> NodeId {
        let kind = match node.kind {
            NodeKind::Root => NodeKind::Note,
            kind => kind,
        };
        let body = node.body.replace('\n', " ");
        let children: Vec<NodeId> = node.children.iter().map(|c| self.materialize(c)).collect();
        let id = self.nodes.insert(Node {
            attributes: node.attributes.clone(),
            expanded: node.expanded,
            ..Node::new(kind, &body)
        });
        self.attach(id, 0, &children);
        id
    }

    fn check_movable(&self, ids: &[NodeId], parent: NodeId) -> Result<()> {
        self.node(parent)?;
        for &id in ids {
            self.node(id)?;
            if id == self.root {
                return Err(OutlineError::InvalidMove("the root cannot be moved"));
            }
            if id == parent || self.contains(id, parent) {
                return Err(OutlineError::InvalidMove(
                    "a branch cannot be moved into itself",
                ));
            }
        }
        Ok(())
    }

    fn check_next_sibling(&self, parent: NodeId, next_sibling: Option<NodeId>) -> Result<()> {
        match next_sibling {
            Some(sibling) if self.nodes.get(sibling).and_then(|n| n.parent) != Some(parent) => {
                Err(OutlineError::InvalidMove(
                    "next sibling is not a child of the parent",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl DocumentModel for MemoryOutline {
    fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(&mut self, kind: NodeKind, body: &str) -> NodeId {
        self.nodes.insert(Node::new(kind, &body.replace('\n', " ")))
    }

    fn clone_nodes(&mut self, ids: &[NodeId]) -> Result<Vec<NodeId>> {
        for &id in ids {
            self.node(id)?;
        }
        Ok(ids.iter().map(|&id| self.deep_clone(id)).collect())
    }

    fn set_body(&mut self, id: NodeId, body: &str) -> Result<()> {
        self.node(id)?;
        if body.contains('\n') {
            return Err(OutlineError::Model("a body is a single line".to_string()));
        }
        self.record_undo();
        let node = &mut self.nodes[id];
        node.body = body.to_string();
        if node.kind != NodeKind::Root {
            node.kind = NodeKind::infer(body);
        }
        self.publish();
        Ok(())
    }

    fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> Result<()> {
        self.node(id)?;
        self.record_undo();
        let attributes = &mut self.nodes[id].attributes;
        match value {
            Some(value) => attributes.insert(name.to_string(), value.to_string()),
            None => attributes.remove(name),
        };
        self.publish();
        Ok(())
    }

    fn insert_children(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
        next_sibling: Option<NodeId>,
    ) -> Result<()> {
        self.check_movable(children, parent)?;
        self.check_next_sibling(parent, next_sibling)?;
        if children.iter().any(|&c| self.nodes[c].parent.is_some()) {
            return Err(OutlineError::InvalidMove("node is already attached"));
        }
        self.record_undo();
        let index = next_sibling
            .and_then(|s| self.child_index(parent, s))
            .unwrap_or(usize::MAX);
        self.attach(parent, index, children);
        self.publish();
        Ok(())
    }

    fn remove_from_parent(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        if id == self.root {
            return Err(OutlineError::InvalidMove("the root cannot be removed"));
        }
        self.record_undo();
        self.detach(id);
        self.publish();
        Ok(())
    }

    fn move_branches(
        &mut self,
        ids: &[NodeId],
        parent: NodeId,
        next_sibling: Option<NodeId>,
    ) -> Result<()> {
        self.check_movable(ids, parent)?;
        self.check_next_sibling(parent, next_sibling)?;

        // The anchor must survive detaching the moved nodes.
        let anchor = next_sibling.and_then(|sibling| {
            let siblings = &self.nodes[parent].children;
            let start = siblings.iter().position(|&c| c == sibling)?;
            siblings[start..]
                .iter()
                .copied()
                .find(|c| !ids.contains(c))
        });

        self.record_undo();
        for &id in ids {
            self.detach(id);
        }
        let index = anchor
            .and_then(|a| self.child_index(parent, a))
            .unwrap_or(usize::MAX);
        self.attach(parent, index, ids);
        self.publish();
        Ok(())
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(parent, id)?;
        self.nodes[parent].children.get(index + 1).copied()
    }

    fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(parent, id)?;
        index
            .checked_sub(1)
            .map(|i| self.nodes[parent].children[i])
    }

    fn can_have_children(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id).map(|n| n.kind)
    }

    fn body(&self, id: NodeId) -> Option<String> {
        self.nodes.get(id).map(|n| n.body.clone())
    }

    fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.nodes.get(id)?.attributes.get(name).cloned()
    }

    fn is_expanded(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.expanded)
    }

    fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<()> {
        self.node(id)?;
        self.nodes[id].expanded = expanded;
        self.publish();
        Ok(())
    }

    fn begin_undo_grouping(&mut self) {
        if self.undo_depth == 0 {
            self.push_undo_snapshot();
            self.group_dirty = false;
        }
        self.undo_depth += 1;
    }

    fn end_undo_grouping(&mut self) {
        debug_assert!(self.undo_depth > 0, "unbalanced undo grouping");
        self.undo_depth = self.undo_depth.saturating_sub(1);
        if self.undo_depth == 0 && !self.group_dirty {
            self.undo_stack.pop();
        }
    }

    fn displayed_text(&self) -> String {
        self.lines.iter().map(|l| format!("{}\n", l.body)).collect()
    }

    fn replace_range(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        self.replace_range_calls += 1;
        if std::mem::take(&mut self.fail_next_edit) {
            return Err(OutlineError::Model("edit rejected".to_string()));
        }
        let len = self.text_len();
        if range.start > range.end || range.end > len {
            return Err(OutlineError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        if text.contains(['\r', '\u{000C}', '\u{2029}', '\u{2B7F}']) {
            return Err(OutlineError::Model(
                "line endings must be normalized".to_string(),
            ));
        }

        self.record_undo();
        let mut text = text.to_string();
        if range.end == len {
            text.push('\n');
        }

        let starts = line_starts(&self.lines);
        let window = if self.lines.is_empty() {
            0..0
        } else {
            line_index_at(&starts, range.start)..line_index_at(&starts, range.end) + 1
        };
        let window_start = starts.get(window.start).copied().unwrap_or(0);
        let old_text: String = self.lines[window.clone()]
            .iter()
            .map(|l| format!("{}\n", l.body))
            .collect();
        let old_chars: Vec<char> = old_text.chars().collect();
        let mut new_text: String = old_chars[..range.start - window_start].iter().collect();
        new_text.push_str(&text);
        new_text.extend(&old_chars[range.end - window_start..]);

        let bodies: Vec<&str> = new_text
            .strip_suffix('\n')
            .unwrap_or(&new_text)
            .split('\n')
            .collect();
        let window_ids: Vec<NodeId> = self.lines[window].iter().map(|l| l.id).collect();

        for (&id, body) in window_ids.iter().zip(&bodies) {
            let node = &mut self.nodes[id];
            node.body = body.to_string();
            node.kind = NodeKind::infer(body);
        }

        if bodies.len() > window_ids.len() {
            let new_ids: Vec<NodeId> = bodies[window_ids.len()..]
                .iter()
                .map(|body| self.nodes.insert(Node::new(NodeKind::infer(body), body)))
                .collect();
            match window_ids.last() {
                Some(&anchor) => {
                    let parent = self.nodes[anchor].parent.unwrap_or(self.root);
                    let index = self.child_index(parent, anchor).map_or(usize::MAX, |i| i + 1);
                    self.attach(parent, index, &new_ids);
                    if self.nodes[anchor].expanded
                        && let Some(&last) = new_ids.last()
                    {
                        let children = std::mem::take(&mut self.nodes[anchor].children);
                        self.attach(last, 0, &children);
                    }
                }
                None => {
                    let root = self.root;
                    self.attach(root, usize::MAX, &new_ids);
                }
            }
        } else {
            for &id in &window_ids[bodies.len()..] {
                self.remove_line_node(id);
            }
        }

        self.publish();
        Ok(())
    }

    fn node_ids_in_range(&self, range: Range<usize>) -> Vec<NodeId> {
        if self.lines.is_empty() {
            return vec![self.root];
        }
        let starts = line_starts(&self.lines);
        let first = line_index_at(&starts, range.start);
        let last = if range.end > range.start {
            line_index_at(&starts, range.end - 1)
        } else {
            first
        };
        self.lines[first..=last.max(first)]
            .iter()
            .map(|l| l.id)
            .collect()
    }

    fn metadata_for_nodes(&self, ids: &[NodeId]) -> Vec<NodeMetadata> {
        ids.iter()
            .filter_map(|&id| {
                let node = self.nodes.get(id)?;
                Some(NodeMetadata {
                    id,
                    kind: node.kind,
                    indent_level: self.depth(id),
                    style_key_path: node.style_key_path(),
                    run_styles: derive_run_styles(node.kind, &node.body),
                    body_len: node.body.chars().count(),
                })
            })
            .collect()
    }

    fn guide_ranges(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let starts = line_starts(&self.lines);
        let end_of = |i: usize| starts[i] + self.lines[i].len + 1;

        let mut spans = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            while let Some(&top) = open.last()
                && self.lines[top].depth >= line.depth
            {
                open.pop();
                if i - 1 > top {
                    spans.push(starts[top]..end_of(i - 1));
                }
            }
            open.push(i);
        }
        let last = self.lines.len().saturating_sub(1);
        while let Some(top) = open.pop() {
            if last > top {
                spans.push(starts[top]..end_of(last));
            }
        }

        spans.retain(|span| intersects(span, &range));
        spans.sort_by_key(|span| span.start);
        spans
    }

    fn take_changes(&mut self) -> Vec<TreeChange> {
        std::mem::take(&mut self.changes)
    }

    fn serialize_branches(&self, ids: &[NodeId]) -> Result<Vec<SerializedNode>> {
        ids.iter()
            .map(|&id| {
                self.node(id)?;
                Ok(self.serialize(id))
            })
            .collect()
    }

    fn deserialize_branches(&mut self, nodes: &[SerializedNode]) -> Result<Vec<NodeId>> {
        Ok(nodes.iter().map(|n| self.materialize(n)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "Inbox:\n\t- buy milk @today\n\tcall mom\nWork:\n\t- ship it\n";

    fn text_edits(changes: &[TreeChange]) -> Vec<TreeEdit> {
        changes
            .iter()
            .filter_map(|c| match c {
                TreeChange::Text(edit) => Some(edit.clone()),
                TreeChange::Structure(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_and_display() {
        let outline = MemoryOutline::from_outline_text(SAMPLE);
        assert_eq!(
            outline.displayed_text(),
            "Inbox:\n- buy milk @today\ncall mom\nWork:\n- ship it\n"
        );
        assert_eq!(outline.to_outline_text(), SAMPLE);
        let inbox = outline.find("Inbox:").unwrap();
        assert_eq!(outline.kind(inbox), Some(NodeKind::Project));
        assert_eq!(outline.depth(inbox), 1);
        assert_eq!(outline.children(inbox).len(), 2);
    }

    #[test]
    fn test_empty_document_resolves_to_root() {
        let outline = MemoryOutline::new();
        assert_eq!(outline.displayed_text(), "");
        assert_eq!(outline.node_ids_in_range(0..0), vec![outline.root()]);
    }

    #[test]
    fn test_replace_range_edits_body_in_place() {
        let mut outline = MemoryOutline::from_outline_text("one\ntwo\nthree\n");
        let two = outline.find("two").unwrap();
        outline.replace_range(4..7, "TWO").unwrap();
        assert_eq!(outline.displayed_text(), "one\nTWO\nthree\n");
        assert_eq!(outline.body(two).as_deref(), Some("TWO"));
        assert_eq!(
            text_edits(&outline.take_changes()),
            vec![TreeEdit::new(4..7, "TWO")]
        );
    }

    #[test]
    fn test_replace_range_split_moves_children_to_new_node() {
        let mut outline = MemoryOutline::from_outline_text("parent\n\tchild\n");
        let parent = outline.find("parent").unwrap();
        outline.replace_range(6..6, "\nsibling").unwrap();
        assert_eq!(outline.displayed_text(), "parent\nsibling\nchild\n");
        let sibling = outline.find("sibling").unwrap();
        assert!(outline.children(parent).is_empty());
        assert_eq!(outline.parent(sibling), Some(outline.root()));
        assert_eq!(outline.children(sibling), vec![outline.find("child").unwrap()]);
    }

    #[test]
    fn test_replace_range_merge_promotes_children() {
        let mut outline = MemoryOutline::from_outline_text("a\nb\n\tc\n");
        let b = outline.find("b").unwrap();
        let c = outline.find("c").unwrap();
        outline.take_changes();
        outline.replace_range(1..2, "").unwrap();
        assert_eq!(outline.displayed_text(), "ab\nc\n");
        assert_eq!(outline.parent(c), Some(outline.root()));
        let changes = outline.take_changes();
        assert!(changes.contains(&TreeChange::Structure(b)));
        assert!(changes.contains(&TreeChange::Structure(c)));
    }

    #[test]
    fn test_replace_range_at_end_appends_terminator() {
        let mut outline = MemoryOutline::new();
        outline.replace_range(0..0, "first").unwrap();
        assert_eq!(outline.displayed_text(), "first\n");
        outline.replace_range(0..6, "").unwrap();
        assert_eq!(outline.displayed_text(), "\n");
    }

    #[test]
    fn test_structural_edits_are_whole_line_diffs() {
        let mut outline = MemoryOutline::from_outline_text("one\ntwo\nthree\n");
        let one = outline.find("one").unwrap();
        let three = outline.find("three").unwrap();
        outline.move_branches(&[three], outline.root(), Some(one)).unwrap();
        assert_eq!(outline.displayed_text(), "three\none\ntwo\n");
        let edits = text_edits(&outline.take_changes());
        assert_eq!(edits.len(), 1);
        assert!(edits[0].text.ends_with('\n') || edits[0].text.is_empty());
    }

    #[test]
    fn test_collapse_hides_children() {
        let mut outline = MemoryOutline::from_outline_text(SAMPLE);
        let inbox = outline.find("Inbox:").unwrap();
        outline.set_expanded(inbox, false).unwrap();
        assert_eq!(outline.displayed_text(), "Inbox:\nWork:\n- ship it\n");
    }

    #[test]
    fn test_move_into_self_is_rejected() {
        let mut outline = MemoryOutline::from_outline_text(SAMPLE);
        let inbox = outline.find("Inbox:").unwrap();
        let milk = outline.find("- buy milk @today").unwrap();
        let err = outline.move_branches(&[inbox], milk, None).unwrap_err();
        assert!(matches!(err, OutlineError::InvalidMove(_)));
    }

    #[test]
    fn test_undo_restores_group() {
        let mut outline = MemoryOutline::from_outline_text("one\ntwo\n");
        let one = outline.find("one").unwrap();
        outline.begin_undo_grouping();
        outline.set_body(one, "ONE").unwrap();
        outline.set_attribute(one, DONE_ATTRIBUTE, Some("")).unwrap();
        outline.end_undo_grouping();
        assert_eq!(outline.undo_group_count(), 1);
        assert!(outline.undo());
        assert_eq!(outline.displayed_text(), "one\ntwo\n");
        assert_eq!(outline.attribute(one, DONE_ATTRIBUTE), None);
    }

    #[test]
    fn test_empty_undo_group_is_dropped() {
        let mut outline = MemoryOutline::new();
        outline.begin_undo_grouping();
        outline.end_undo_grouping();
        assert_eq!(outline.undo_group_count(), 0);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut outline = MemoryOutline::from_outline_text(SAMPLE);
        let inbox = outline.find("Inbox:").unwrap();
        let serialized = outline.serialize_branches(&[inbox]).unwrap();
        assert_eq!(serialized[0].branch_len(), 3);
        let copies = outline.deserialize_branches(&serialized).unwrap();
        assert_eq!(outline.serialize_branches(&copies).unwrap(), serialized);
        assert_eq!(outline.parent(copies[0]), None);
    }

    #[test]
    fn test_guide_ranges() {
        let outline = MemoryOutline::from_outline_text("a\n\tb\n\t\tc\nd\n");
        // "a\nb\nc\nd\n": a spans 0..6, b spans 2..6
        assert_eq!(outline.guide_ranges(0..8), vec![0..6, 2..6]);
        assert_eq!(outline.guide_ranges(6..8), Vec::<Range<usize>>::new());
    }

    #[test]
    fn test_done_changes_style_key_path() {
        let mut outline = MemoryOutline::from_outline_text("- task\n");
        let task = outline.find("- task").unwrap();
        outline.take_changes();
        outline.toggle_done(task).unwrap();
        assert_eq!(
            outline.take_changes(),
            vec![TreeChange::Structure(task)]
        );
        let metadata = outline.metadata_for_nodes(&[task]);
        assert_eq!(metadata[0].style_key_path, "item.task.done");
    }
}
