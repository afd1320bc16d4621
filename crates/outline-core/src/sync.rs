//! Direction of the synchronization currently in progress.

use crate::error::{OutlineError, Result};

/// Which side is currently being applied to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Nothing is being applied.
    #[default]
    Idle,
    /// A tree-originated change is being spliced into the buffer.
    ApplyingFromModel,
    /// A buffer-originated change is being forwarded to the model.
    ApplyingFromView,
}

impl SyncState {
    /// Short name used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::ApplyingFromModel => "model",
            SyncState::ApplyingFromView => "view",
        }
    }

    /// Enter `next` from `self`. Only `Idle` may be left.
    pub fn enter(&mut self, next: SyncState) -> Result<()> {
        if *self != SyncState::Idle {
            return Err(OutlineError::Reentrant {
                active: self.as_str(),
                attempted: next.as_str(),
            });
        }
        *self = next;
        Ok(())
    }

    /// Return to `Idle`.
    pub fn leave(&mut self) {
        *self = SyncState::Idle;
    }

    /// `true` if no direction is active.
    pub fn is_idle(&self) -> bool {
        *self == SyncState::Idle
    }
}
