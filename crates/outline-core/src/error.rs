//! Error types.
//!
//! Every fallible operation returns [`Result`]. Model refusals, reentrant edits and
//! payload problems leave the buffer and the model as they were.

use std::ops::Range;

use thiserror::Error;

use crate::model::NodeId;

/// Result alias used throughout `outline-core`.
pub type Result<T, E = OutlineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
/// Errors produced by the outline synchronization and layout core.
pub enum OutlineError {
    #[error("range {start}..{end} is outside the buffer (length {len})")]
    /// A character range does not lie within the buffer.
    RangeOutOfBounds {
        /// Requested start offset.
        start: usize,
        /// Requested end offset (exclusive).
        end: usize,
        /// Buffer length in characters.
        len: usize,
    },

    #[error("unknown node {0:?}")]
    /// A node id does not exist in the document model.
    UnknownNode(NodeId),

    #[error("edit from the {attempted} side while applying changes from the {active} side")]
    /// A mutation would run against the direction currently being applied.
    Reentrant {
        /// Direction currently being applied.
        active: &'static str,
        /// Direction of the rejected call.
        attempted: &'static str,
    },

    #[error("invalid move: {0}")]
    /// A structural move would create a cycle or target an impossible location.
    InvalidMove(&'static str),

    #[error("document model error: {0}")]
    /// The document model refused an operation; nothing was mutated.
    Model(String),

    #[error("malformed pasteboard payload: {0}")]
    /// An item payload could not be parsed.
    Payload(#[source] serde_json::Error),

    #[error("unsupported pasteboard payload version {0}")]
    /// An item payload was written by an incompatible version.
    UnsupportedPayloadVersion(u32),

    #[error("malformed settings: {0}")]
    /// Editor settings or a stylesheet could not be parsed.
    Settings(#[source] serde_json::Error),

    #[error("paragraph table out of sync with the document model in {range:?}")]
    /// The model reported a different number of nodes than the buffer has paragraphs.
    OutOfSync {
        /// Character range that could not be resolved.
        range: Range<usize>,
    },
}
