#![warn(missing_docs)]
//! Outline Core - Headless Outline Editor Synchronization and Layout Kernel
//!
//! # Overview
//!
//! `outline-core` keeps a flat, paragraph-delimited character buffer (what a text view
//! renders) in lockstep with a hierarchical document model (a tree of nodes owning a body
//! and structural attributes). It does not draw anything; it hands the host view the
//! buffer, per-paragraph geometry and the semantic meaning of pointer positions.
//!
//! # Core Features
//!
//! - **Bidirectional sync**: one paragraph per visible node, view edits forwarded to the
//!   model exactly once, model edits never echoed back
//! - **Edit brackets**: nested `begin_edit`/`end_edit`, one undo group and one coalesced
//!   change notification per outermost bracket
//! - **Metadata cache**: batch-fetched per-node render metadata, evicted precisely by
//!   edited range
//! - **Depth-driven layout**: indentation, wrap width, hanging indents, reserved room for
//!   invisible glyphs, guide lines, selection gaps and handle bullets
//! - **Hit testing and selection**: handle/body/link picking, word → document ladder
//! - **Drag reordering**: threshold, drop classification, legality, one undo group per drop
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  OutlineEditor facade                       │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Drag & Drop / Pasteboard                   │  ← Structural edits
//! ├─────────────────────────────────────────────┤
//! │  Hit Testing & Selection                    │  ← Pointer semantics
//! ├─────────────────────────────────────────────┤
//! │  Layout Engine (depth-driven wrapping)      │  ← Geometry
//! ├─────────────────────────────────────────────┤
//! │  Text Storage + Metadata Cache              │  ← Buffer ↔ tree sync
//! ├─────────────────────────────────────────────┤
//! │  DocumentModel / StyleResolver traits       │  ← External collaborators
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use outline_core::{DocumentModel, MemoryOutline, OutlineTextStorage};
//!
//! let model = MemoryOutline::from_outline_text("Inbox:\n\t- milk\n");
//! let mut storage = OutlineTextStorage::new(model).unwrap();
//! assert_eq!(storage.text(), "Inbox:\n- milk\n");
//!
//! // View-side edits reach the model once.
//! storage.replace_range(7..13, "- eggs").unwrap();
//! assert_eq!(storage.model().to_outline_text(), "Inbox:\n\t- eggs\n");
//!
//! // Model-side edits land in the buffer without being echoed back.
//! let inbox = storage.model().find("Inbox:").unwrap();
//! storage.perform_model_edit(|m| m.set_body(inbox, "Home:")).unwrap();
//! assert_eq!(storage.text(), "Home:\n- eggs\n");
//! ```
//!
//! # Module Description
//!
//! - [`text_storage`] - Buffer ↔ tree synchronization
//! - [`paragraphs`] - Rope-backed paragraph table
//! - [`metadata`] - Per-node render metadata cache
//! - [`layout`] - Depth-driven headless layout
//! - [`hit_test`] / [`selection`] - Pointer picking and the selection ladder
//! - [`drag`] / [`pasteboard`] - Branch reordering and payloads
//! - [`editor`] - Facade wiring everything for a host view
//!
//! # Unicode Support
//!
//! - Offsets are counted in Unicode scalar values
//! - CJK double-width characters measured per UAX #11
//! - Word and sentence boundaries per UAX #29

pub mod context;
pub mod debounce;
pub mod delta;
pub mod drag;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod layout;
pub mod line_ending;
pub mod memory;
pub mod metadata;
pub mod model;
pub mod paragraphs;
pub mod pasteboard;
pub mod selection;
pub mod settings;
pub mod style;
pub mod sync;
pub mod text_storage;

pub use context::EditorContext;
pub use debounce::Debouncer;
pub use delta::{TextDelta, TextDeltaEdit};
pub use drag::{
    DragController, DragOperation, DragOperationMask, DragSource, DragState, DropLocation,
    DropOutcome, DropProposal, DropTarget, PointerUp,
};
pub use editor::{OutlineEditor, PointerDown};
pub use error::{OutlineError, Result};
pub use geometry::{Point, Rect, Size};
pub use hit_test::ItemPick;
pub use layout::{
    GuideLine, HandleMark, InvisibleGlyph, ItemGeometry, Layout, LayoutEngine, LineFragment,
    ParagraphLayout, SelectionGap,
};
pub use memory::MemoryOutline;
pub use metadata::{
    LinkTarget, NodeMetadata, NodeMetadataCache, RunSpan, RunStyle, RunStyling, derive_run_styles,
};
pub use model::{
    DONE_ATTRIBUTE, DocumentModel, NodeId, NodeKind, SerializedNode, TreeChange, TreeEdit,
};
pub use paragraphs::ParagraphTable;
pub use pasteboard::{ItemPayload, Pasteboard, PasteboardContent};
pub use selection::{SelectionLevel, SelectionPoint, SelectionState};
pub use settings::{EditorSettings, ModifierKey, Modifiers};
pub use style::{Color, ComputedStyle, FontMetrics, StyleResolver, StyleSheet};
pub use sync::SyncState;
pub use text_storage::{EditOrigin, OutlineTextStorage, StorageChange};
