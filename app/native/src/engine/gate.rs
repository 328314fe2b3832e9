//! Mode gate: the external predicate that switches processing on and off.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

/// Answers whether the host is in the mode where interception is wanted.
///
/// Consulted at the start of every intercepted call. While it answers `false`
/// the engine does nothing beyond letting the original call run.
pub trait ModeGate: Send {
    fn is_active(&self) -> bool;
}

impl<F> ModeGate for F
where
    F: Fn() -> bool + Send,
{
    fn is_active(&self) -> bool { self() }
}

/// Builds a gate that follows a shared flag.
#[must_use]
pub fn flag_gate(flag: &Arc<AtomicBool>) -> impl ModeGate + 'static {
    let flag = Arc::clone(flag);
    move || flag.load(Ordering::Acquire)
}

/// Gate state reported to gate observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GateState {
    Active,
    Inactive,
}

impl GateState {
    #[must_use]
    pub const fn from_active(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }
}

/// Detects gate transitions between consecutive observations.
///
/// Starts out inactive, so the first `true` observation is a transition.
#[derive(Debug, Default)]
pub struct GateTracker {
    active: bool,
}

impl GateTracker {
    /// Records `active` and returns the new state if it changed.
    pub const fn observe(&mut self, active: bool) -> Option<GateState> {
        if self.active == active {
            return None;
        }
        self.active = active;
        Some(GateState::from_active(active))
    }

    #[must_use]
    pub const fn is_active(&self) -> bool { self.active }
}
