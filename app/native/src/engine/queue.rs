//! Bounded drain of the host's discrete key-event queue.

use super::dispatch::{DispatchOutcome, Dispatcher, Occurrence};
use super::mirror::StateMirror;
use crate::input::{HostKeyMap, HostKeyboard, KeyEventKind};

/// Hard upper bound on entries read per tick, whatever the host reports.
pub const MAX_QUEUE_ENTRIES: usize = 64;

/// Number of entries to read for a host-reported count.
///
/// Negative counts read nothing; oversized counts are clamped.
#[must_use]
pub fn bounded_len(reported: i32) -> usize {
    usize::try_from(reported).unwrap_or(0).min(MAX_QUEUE_ENTRIES)
}

/// Whether queue entries of `kind` are dispatched as key presses.
#[must_use]
pub const fn is_dispatched(kind: KeyEventKind) -> bool {
    !matches!(kind, KeyEventKind::AnyKeyHeld | KeyEventKind::Released)
}

/// Counters for one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Entries read, after bounding.
    pub read: usize,
    /// Entries skipped: empty slots and non-dispatched kinds.
    pub skipped: usize,
    pub dispatched: usize,
    /// Entries at least one observer consumed.
    pub consumed: usize,
}

/// Walks the queue in order and dispatches each eligible entry.
///
/// Consuming an entry zeroes its key in the queue's own key map, in the
/// parallel host key map and in the mirror. `on_dispatch` sees every
/// dispatched occurrence with its outcome.
pub fn drain(
    dispatcher: &mut Dispatcher,
    mirror: &mut StateMirror,
    queue: &mut dyn HostKeyboard,
    key_state: &mut dyn HostKeyMap,
    mut on_dispatch: impl FnMut(Occurrence, DispatchOutcome),
) -> QueueStats {
    mirror.update_keys(queue.snapshot());

    let mut stats = QueueStats { read: bounded_len(queue.reported_count()), ..QueueStats::default() };
    for index in 0..stats.read {
        let Some(event) = queue.entry(index) else {
            stats.skipped += 1;
            continue;
        };
        if !is_dispatched(event.kind) {
            stats.skipped += 1;
            continue;
        }

        let outcome = dispatcher.dispatch_key(&event, || {
            queue.clear_key(event.key);
            key_state.clear_key(event.key);
            mirror.suppress_key(event.key);
        });

        stats.dispatched += 1;
        if outcome.is_consumed() {
            stats.consumed += 1;
        }
        on_dispatch(Occurrence::KeyPressed(event), outcome);
    }
    stats
}
