//! The process-wide "active flow" identifier (spec §6 Settings surface,
//! §4.E.5 repeater liveness guard).
//!
//! Exactly one flow may be "active" at a time from the runner's point of
//! view. Repeater nodes re-check this before every iteration so that
//! changing the active flow stops all outstanding repeater loops within one
//! tick (spec §5 Cancellation / timeouts, scenario 5 in §8).

use std::sync::RwLock;
use uuid::Uuid;

/// Shared, lock-guarded holder for the currently active flow id.
#[derive(Debug, Default)]
pub struct ActiveFlowState {
    current: RwLock<Option<Uuid>>,
}

impl ActiveFlowState {
    /// Construct with no active flow.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Construct with the given flow already active.
    pub fn with_active(flow_id: Uuid) -> Self {
        Self {
            current: RwLock::new(Some(flow_id)),
        }
    }

    /// The currently active flow id, if any.
    pub fn get(&self) -> Option<Uuid> {
        *self.current.read().unwrap()
    }

    /// Set (or clear, with `None`) the active flow.
    pub fn set(&self, flow_id: Option<Uuid>) {
        *self.current.write().unwrap() = flow_id;
    }

    /// Whether `flow_id` is still the active flow — the guard repeaters
    /// must pass before launching (or re-launching) their loop.
    pub fn is_active(&self, flow_id: Uuid) -> bool {
        self.get() == Some(flow_id)
    }
}
