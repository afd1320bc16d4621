//! Clipboard and drag payloads.
//!
//! Items travel as a JSON [`ItemPayload`] under a custom type, with tab-indented plain
//! text alongside so other applications still receive something useful. Readers prefer
//! the item reference, then URLs, then plain text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OutlineError, Result};
use crate::metadata::derive_run_styles;
use crate::model::{DocumentModel, NodeId, SerializedNode};

/// Pasteboard type of an item reference.
pub const ITEM_REFERENCE_TYPE: &str = "application/vnd.outline-core.item-reference+json";
/// Pasteboard type of a URL list.
pub const URI_LIST_TYPE: &str = "text/uri-list";
/// Pasteboard type of plain text.
pub const PLAIN_TEXT_TYPE: &str = "text/plain";

/// Version written into every payload.
pub const ITEM_PAYLOAD_VERSION: u32 = 1;

/// Serialized branches plus, for drags inside one document, references to the originals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPayload {
    /// Format version.
    pub version: u32,
    /// Identifier of the document the items came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
    /// Top-level node references in the source document.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeId>,
    /// Serialized branches, in document order.
    pub items: Vec<SerializedNode>,
}

impl ItemPayload {
    /// Capture `ids` (and their branches) from `model`.
    pub fn capture<M: DocumentModel + ?Sized>(
        model: &M,
        ids: &[NodeId],
        source_document: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            version: ITEM_PAYLOAD_VERSION,
            source_document: source_document.map(str::to_string),
            nodes: ids.to_vec(),
            items: model.serialize_branches(ids)?,
        })
    }

    /// A payload with no source references, e.g. parsed from plain text.
    pub fn detached(items: Vec<SerializedNode>) -> Self {
        Self {
            version: ITEM_PAYLOAD_VERSION,
            source_document: None,
            nodes: Vec::new(),
            items,
        }
    }

    /// Parse a payload, rejecting versions newer than this crate writes.
    pub fn from_json(json: &str) -> Result<Self> {
        let payload: Self = serde_json::from_str(json).map_err(OutlineError::Payload)?;
        if payload.version == 0 || payload.version > ITEM_PAYLOAD_VERSION {
            return Err(OutlineError::UnsupportedPayloadVersion(payload.version));
        }
        Ok(payload)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(OutlineError::Payload)
    }

    /// `true` if the payload references nodes of `document`.
    pub fn is_from(&self, document: &str) -> bool {
        !self.nodes.is_empty() && self.source_document.as_deref() == Some(document)
    }

    /// Tab-indented plain text of the items.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            write_outline(item, 0, &mut out);
        }
        out
    }

    /// Links found in the item bodies, in order.
    pub fn urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        let mut stack: Vec<&SerializedNode> = self.items.iter().rev().collect();
        while let Some(item) = stack.pop() {
            urls.extend(
                derive_run_styles(item.kind, &item.body)
                    .into_iter()
                    .filter(|run| run.style_key_path == "run.link")
                    .filter_map(|run| run.link),
            );
            stack.extend(item.children.iter().rev());
        }
        urls
    }
}

fn write_outline(item: &SerializedNode, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push('\t');
    }
    out.push_str(&item.body);
    out.push('\n');
    for child in &item.children {
        write_outline(child, depth + 1, out);
    }
}

/// Parse tab-indented text into detached branches. Blank trailing lines are ignored.
pub fn items_from_plain_text(text: &str) -> Vec<SerializedNode> {
    let mut roots: Vec<SerializedNode> = Vec::new();
    // Path of child indices from a root to the last inserted node.
    let mut path: Vec<usize> = Vec::new();
    let lines: Vec<&str> = text.lines().collect();
    let last_content = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map_or(0, |i| i + 1);

    for raw in &lines[..last_content] {
        let depth = raw.chars().take_while(|&c| c == '\t').count();
        let node = SerializedNode::leaf(&raw[depth..]);
        let depth = depth.min(path.len());
        path.truncate(depth);

        let mut siblings = &mut roots;
        for &index in &path {
            siblings = &mut siblings[index].children;
        }
        siblings.push(node);
        path.push(siblings.len() - 1);
    }
    roots
}

/// What a reader found on the pasteboard, by preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteboardContent {
    /// Item reference payload.
    Items(ItemPayload),
    /// URL list.
    Urls(Vec<String>),
    /// Plain text.
    Text(String),
}

impl PasteboardContent {
    /// Items to insert for this content.
    pub fn into_payload(self) -> ItemPayload {
        match self {
            PasteboardContent::Items(payload) => payload,
            PasteboardContent::Urls(urls) => {
                ItemPayload::detached(urls.into_iter().map(SerializedNode::leaf).collect())
            }
            PasteboardContent::Text(text) => ItemPayload::detached(items_from_plain_text(&text)),
        }
    }
}

/// An in-memory typed pasteboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pasteboard {
    entries: BTreeMap<String, String>,
}

impl Pasteboard {
    /// Empty pasteboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `kind`.
    pub fn set(&mut self, kind: &str, data: impl Into<String>) {
        self.entries.insert(kind.to_string(), data.into());
    }

    /// Data stored under `kind`.
    pub fn get(&self, kind: &str) -> Option<&str> {
        self.entries.get(kind).map(String::as_str)
    }

    /// Types present, sorted.
    pub fn types(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write an item payload with its plain-text and URL degradations.
    pub fn write_items(&mut self, payload: &ItemPayload) -> Result<()> {
        self.clear();
        self.set(ITEM_REFERENCE_TYPE, payload.to_json()?);
        self.set(PLAIN_TEXT_TYPE, payload.plain_text());
        let urls = payload.urls();
        if !urls.is_empty() {
            self.set(URI_LIST_TYPE, urls.join("\r\n"));
        }
        Ok(())
    }

    /// Read the preferred representation.
    ///
    /// A malformed item reference falls back to the next type rather than failing the
    /// whole read; an unsupported payload version is an error.
    pub fn read(&self) -> Result<Option<PasteboardContent>> {
        if let Some(json) = self.get(ITEM_REFERENCE_TYPE) {
            match ItemPayload::from_json(json) {
                Ok(payload) => return Ok(Some(PasteboardContent::Items(payload))),
                Err(err @ OutlineError::UnsupportedPayloadVersion(_)) => return Err(err),
                Err(err) => tracing::warn!(error = %err, "ignoring malformed item payload"),
            }
        }
        if let Some(list) = self.get(URI_LIST_TYPE) {
            let urls: Vec<String> = list
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect();
            if !urls.is_empty() {
                return Ok(Some(PasteboardContent::Urls(urls)));
            }
        }
        Ok(self
            .get(PLAIN_TEXT_TYPE)
            .map(|text| PasteboardContent::Text(text.to_string())))
    }
}
