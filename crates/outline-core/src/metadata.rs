//! Per-node render metadata and its cache.
//!
//! Querying the document model for style metadata is expensive per round trip, so
//! entries are fetched in batches and kept until the paragraph that owns them is
//! edited (or the model reports the node's structure changed). Entries are shared as
//! `Rc` so that callers can tell a surviving entry from a re-fetched one.

use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DocumentModel, NodeId, NodeKind};

/// Link prefix of the "toggle done" affordance on task markers.
pub const TOGGLE_DONE_LINK_PREFIX: &str = "button://toggledone";
/// Link prefix of tag filter links.
pub const FILTER_LINK_PREFIX: &str = "filter://";

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(@[\w.-]+(?:\([^()]*\))?)").expect("valid tag regex")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-zA-Z][a-zA-Z0-9+.-]*://[^\s()<>]+").expect("valid url regex")
});

/// An inline run of a paragraph body with its own style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStyle {
    /// Style key path of the run.
    pub style_key_path: String,
    /// Optional link target (raw string as supplied by the model).
    pub link: Option<String>,
    /// Length of the run in characters.
    pub length: usize,
}

impl RunStyle {
    /// Create a run. An empty link string is treated as no link.
    pub fn new(style_key_path: impl Into<String>, link: Option<String>, length: usize) -> Self {
        Self {
            style_key_path: style_key_path.into(),
            link: link.filter(|l| !l.is_empty()),
            length,
        }
    }
}

/// Classified link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Toggle the `done` state of the task.
    ToggleDone(String),
    /// Filter the outline (e.g. by tag).
    Filter(String),
    /// Any other URL.
    Url(String),
}

impl LinkTarget {
    /// Classify a raw link string.
    pub fn classify(link: &str) -> Self {
        if link.starts_with(TOGGLE_DONE_LINK_PREFIX) {
            LinkTarget::ToggleDone(link.to_string())
        } else if link.starts_with(FILTER_LINK_PREFIX) {
            LinkTarget::Filter(link.to_string())
        } else {
            LinkTarget::Url(link.to_string())
        }
    }

    /// The raw link string.
    pub fn as_str(&self) -> &str {
        match self {
            LinkTarget::ToggleDone(s) | LinkTarget::Filter(s) | LinkTarget::Url(s) => s,
        }
    }
}

/// A run resolved to an absolute-in-paragraph range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpan {
    /// Range relative to the paragraph start.
    pub range: Range<usize>,
    /// Style key path.
    pub style_key_path: String,
    /// Classified link.
    pub link: Option<LinkTarget>,
}

/// Outcome of validating run lengths against a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStyling {
    /// No runs were supplied.
    None,
    /// Runs cover the body exactly.
    Valid,
    /// Run lengths do not sum to the body length; runs are ignored.
    Mismatch {
        /// Sum of the run lengths.
        runs_len: usize,
        /// Body length.
        body_len: usize,
    },
}

/// Cached rendering facts for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMetadata {
    /// Node id.
    pub id: NodeId,
    /// Node type.
    pub kind: NodeKind,
    /// Depth relative to the hoisted root (top-level nodes are at level 1).
    pub indent_level: usize,
    /// Style key path of the whole paragraph.
    pub style_key_path: String,
    /// Ordered inline runs, relative to paragraph start.
    pub run_styles: Vec<RunStyle>,
    /// Body length in characters at the time the metadata was computed.
    pub body_len: usize,
}

impl NodeMetadata {
    /// Validate runs against the body length.
    pub fn run_styling(&self) -> RunStyling {
        if self.run_styles.is_empty() {
            return RunStyling::None;
        }
        let runs_len: usize = self.run_styles.iter().map(|r| r.length).sum();
        if runs_len == self.body_len {
            RunStyling::Valid
        } else {
            RunStyling::Mismatch {
                runs_len,
                body_len: self.body_len,
            }
        }
    }

    /// Runs resolved to ranges, or nothing when the lengths do not add up.
    pub fn run_spans(&self) -> Vec<RunSpan> {
        if let RunStyling::Mismatch { runs_len, body_len } = self.run_styling() {
            tracing::warn!(
                node = ?self.id,
                runs_len,
                body_len,
                "run style lengths do not match body, ignoring run styling"
            );
            return Vec::new();
        }

        let mut start = 0usize;
        self.run_styles
            .iter()
            .map(|run| {
                let range = start..start + run.length;
                start = range.end;
                RunSpan {
                    range,
                    style_key_path: run.style_key_path.clone(),
                    link: run.link.as_deref().map(LinkTarget::classify),
                }
            })
            .collect()
    }

    /// The run span covering `offset` (relative to paragraph start).
    pub fn run_at(&self, offset: usize) -> Option<RunSpan> {
        self.run_spans()
            .into_iter()
            .find(|span| span.range.start <= offset && offset < span.range.end)
    }
}

/// Cache of [`NodeMetadata`] keyed by node id.
#[derive(Debug, Default)]
pub struct NodeMetadataCache {
    entries: HashMap<NodeId, Rc<NodeMetadata>>,
    fetch_count: usize,
}

impl NodeMetadataCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, if present.
    pub fn get(&self, id: NodeId) -> Option<Rc<NodeMetadata>> {
        self.entries.get(&id).cloned()
    }

    /// `true` if an entry for `id` is cached.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of model round trips performed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    /// Ensure every id in `ids` is cached, fetching the missing ones in one batch.
    pub fn ensure<M: DocumentModel + ?Sized>(&mut self, ids: &[NodeId], model: &M) {
        let missing: Vec<NodeId> = ids
            .iter()
            .copied()
            .filter(|id| !self.entries.contains_key(id))
            .collect();
        if missing.is_empty() {
            return;
        }

        self.fetch_count += 1;
        tracing::trace!(count = missing.len(), "fetching node metadata batch");
        for metadata in model.metadata_for_nodes(&missing) {
            self.entries.insert(metadata.id, Rc::new(metadata));
        }
    }

    /// Evict entries for `ids`. Returns how many were present.
    pub fn evict<I: IntoIterator<Item = NodeId>>(&mut self, ids: I) -> usize {
        ids.into_iter()
            .filter(|id| self.entries.remove(id).is_some())
            .count()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Inline runs for a body: task marker, tags and URLs, with plain text in between.
///
/// Returns no runs when the body has nothing to style.
pub fn derive_run_styles(kind: NodeKind, body: &str) -> Vec<RunStyle> {
    let mut spans: Vec<(Range<usize>, &str, Option<String>)> = Vec::new();
    if kind == NodeKind::Task && body.starts_with("- ") {
        spans.push((0..2, "run.marker", Some(TOGGLE_DONE_LINK_PREFIX.to_string())));
    }
    for caps in TAG.captures_iter(body) {
        if let Some(tag) = caps.get(1) {
            let name = tag.as_str().split('(').next().unwrap_or_default();
            spans.push((
                tag.range(),
                "run.tag",
                Some(format!("{FILTER_LINK_PREFIX}{name}")),
            ));
        }
    }
    for url in URL.find_iter(body) {
        spans.push((url.range(), "run.link", Some(url.as_str().to_string())));
    }
    if spans.is_empty() {
        return Vec::new();
    }
    spans.sort_by_key(|(range, _, _)| range.start);

    let mut runs = Vec::new();
    let mut pos = 0;
    for (range, key, link) in spans {
        if range.start < pos {
            continue;
        }
        if range.start > pos {
            runs.push(RunStyle::new(
                "run.text",
                None,
                body[pos..range.start].chars().count(),
            ));
        }
        runs.push(RunStyle::new(key, link, body[range.clone()].chars().count()));
        pos = range.end;
    }
    if pos < body.len() {
        runs.push(RunStyle::new("run.text", None, body[pos..].chars().count()));
    }
    runs
}
