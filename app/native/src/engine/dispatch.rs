//! Ordered observer registry and cancellable fan-out.
//!
//! Observers run in subscription order. A cancellable observer returns `true`
//! to consume the occurrence. Consumption never stops the fan-out: later
//! observers still run, but they see the state after the suppression the
//! consuming observer triggered.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::gate::GateState;
use crate::input::{KeyEvent, MouseButton, MouseState, VirtualKey};

/// Observer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    MouseClicked,
    MousePressed,
    KeyPressed,
    KeyReleased,
    GateChanged,
}

impl EventKind {
    /// Whether observers of this kind can consume.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::MouseClicked | Self::MousePressed | Self::KeyPressed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MouseClicked => "mouseClicked",
            Self::MousePressed => "mousePressed",
            Self::KeyPressed => "keyPressed",
            Self::KeyReleased => "keyReleased",
            Self::GateChanged => "gateChanged",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Edge of a mouse-pressed occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonPhase {
    /// The button went down this tick.
    Down,
    /// The button came up this tick.
    Up,
}

/// Payload handed to mouse observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseOccurrence {
    pub button: MouseButton,
    pub phase: ButtonPhase,
    /// Mirror state at the moment this observer runs.
    pub state: MouseState,
}

/// A classified occurrence, as reported after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    MouseClicked(MouseButton),
    MousePressed(MouseButton, ButtonPhase),
    KeyPressed(KeyEvent),
    KeyReleased(VirtualKey),
}

impl Occurrence {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::MouseClicked(_) => EventKind::MouseClicked,
            Self::MousePressed(..) => EventKind::MousePressed,
            Self::KeyPressed(_) => EventKind::KeyPressed,
            Self::KeyReleased(_) => EventKind::KeyReleased,
        }
    }

    /// The mouse button involved, for mouse occurrences.
    #[must_use]
    pub const fn button(&self) -> Option<MouseButton> {
        match self {
            Self::MouseClicked(button) | Self::MousePressed(button, _) => Some(*button),
            Self::KeyPressed(_) | Self::KeyReleased(_) => None,
        }
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MouseClicked(button) => write!(f, "mouseClicked({})", button.label()),
            Self::MousePressed(button, phase) => {
                write!(f, "mousePressed({}, {phase:?})", button.label())
            }
            Self::KeyPressed(event) => write!(f, "keyPressed({}, {:?})", event.key, event.kind),
            Self::KeyReleased(key) => write!(f, "keyReleased({key})"),
        }
    }
}

pub type MouseObserver = Box<dyn FnMut(&MouseOccurrence) -> bool + Send>;
pub type KeyObserver = Box<dyn FnMut(&KeyEvent) -> bool + Send>;
pub type ReleaseObserver = Box<dyn FnMut(VirtualKey) + Send>;
pub type GateObserver = Box<dyn FnMut(GateState) + Send>;

/// A subscription request.
pub enum Observer {
    MouseClicked(MouseObserver),
    MousePressed(MouseObserver),
    KeyPressed(KeyObserver),
    KeyReleased(ReleaseObserver),
    GateChanged(GateObserver),
}

impl Observer {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::MouseClicked(_) => EventKind::MouseClicked,
            Self::MousePressed(_) => EventKind::MousePressed,
            Self::KeyPressed(_) => EventKind::KeyPressed,
            Self::KeyReleased(_) => EventKind::KeyReleased,
            Self::GateChanged(_) => EventKind::GateChanged,
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observer").field(&self.kind()).finish()
    }
}

/// Handle returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    id: Uuid,
    kind: EventKind,
}

impl SubscriptionToken {
    fn new(kind: EventKind) -> Self { Self { id: Uuid::now_v7(), kind } }

    #[must_use]
    pub const fn kind(&self) -> EventKind { self.kind }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}:{}", self.kind, self.id) }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Observers that ran.
    pub observers: usize,
    /// Observers that returned `true`.
    pub consumers: usize,
}

impl DispatchOutcome {
    #[must_use]
    pub const fn is_consumed(&self) -> bool { self.consumers > 0 }
}

/// Per-kind ordered observer lists.
#[derive(Default)]
pub struct Dispatcher {
    mouse_clicked: Vec<(SubscriptionToken, MouseObserver)>,
    mouse_pressed: Vec<(SubscriptionToken, MouseObserver)>,
    key_pressed: Vec<(SubscriptionToken, KeyObserver)>,
    key_released: Vec<(SubscriptionToken, ReleaseObserver)>,
    gate_changed: Vec<(SubscriptionToken, GateObserver)>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mouse_clicked", &self.mouse_clicked.len())
            .field("mouse_pressed", &self.mouse_pressed.len())
            .field("key_pressed", &self.key_pressed.len())
            .field("key_released", &self.key_released.len())
            .field("gate_changed", &self.gate_changed.len())
            .finish()
    }
}

fn remove<T>(list: &mut Vec<(SubscriptionToken, T)>, token: SubscriptionToken) -> bool {
    let before = list.len();
    list.retain(|(existing, _)| *existing != token);
    list.len() != before
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Appends `observer` to the end of its kind's list.
    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionToken {
        let token = SubscriptionToken::new(observer.kind());
        match observer {
            Observer::MouseClicked(f) => self.mouse_clicked.push((token, f)),
            Observer::MousePressed(f) => self.mouse_pressed.push((token, f)),
            Observer::KeyPressed(f) => self.key_pressed.push((token, f)),
            Observer::KeyReleased(f) => self.key_released.push((token, f)),
            Observer::GateChanged(f) => self.gate_changed.push((token, f)),
        }
        tracing::debug!(token = %token, "input: observer subscribed");
        token
    }

    /// Removes the observer behind `token`. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let removed = match token.kind {
            EventKind::MouseClicked => remove(&mut self.mouse_clicked, token),
            EventKind::MousePressed => remove(&mut self.mouse_pressed, token),
            EventKind::KeyPressed => remove(&mut self.key_pressed, token),
            EventKind::KeyReleased => remove(&mut self.key_released, token),
            EventKind::GateChanged => remove(&mut self.gate_changed, token),
        };
        if removed {
            tracing::debug!(token = %token, "input: observer unsubscribed");
        }
        removed
    }

    /// Number of observers registered for `kind`.
    #[must_use]
    pub fn observer_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::MouseClicked => self.mouse_clicked.len(),
            EventKind::MousePressed => self.mouse_pressed.len(),
            EventKind::KeyPressed => self.key_pressed.len(),
            EventKind::KeyReleased => self.key_released.len(),
            EventKind::GateChanged => self.gate_changed.len(),
        }
    }

    /// Fans a mouse occurrence out to the `MouseClicked` or `MousePressed` list.
    ///
    /// After each consuming observer, `suppress` applies the suppression and
    /// returns the updated state that later observers are shown.
    pub fn dispatch_mouse(
        &mut self,
        occurrence: Occurrence,
        mut state: MouseState,
        mut suppress: impl FnMut() -> MouseState,
    ) -> DispatchOutcome {
        let (list, button, phase) = match occurrence {
            Occurrence::MouseClicked(button) => (&mut self.mouse_clicked, button, ButtonPhase::Up),
            Occurrence::MousePressed(button, phase) => (&mut self.mouse_pressed, button, phase),
            Occurrence::KeyPressed(_) | Occurrence::KeyReleased(_) => {
                return DispatchOutcome::default();
            }
        };

        let mut outcome = DispatchOutcome::default();
        for (_, observer) in list.iter_mut() {
            outcome.observers += 1;
            if observer(&MouseOccurrence { button, phase, state }) {
                outcome.consumers += 1;
                state = suppress();
            }
        }
        outcome
    }

    /// Fans a queued key event out to the `KeyPressed` list.
    ///
    /// `suppress` runs after each consuming observer.
    pub fn dispatch_key(&mut self, event: &KeyEvent, mut suppress: impl FnMut()) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for (_, observer) in &mut self.key_pressed {
            outcome.observers += 1;
            if observer(event) {
                outcome.consumers += 1;
                suppress();
            }
        }
        outcome
    }

    /// Notifies `KeyReleased` observers. Not cancellable.
    pub fn notify_key_released(&mut self, key: VirtualKey) -> DispatchOutcome {
        for (_, observer) in &mut self.key_released {
            observer(key);
        }
        DispatchOutcome { observers: self.key_released.len(), consumers: 0 }
    }

    /// Notifies gate observers of a transition.
    pub fn notify_gate(&mut self, state: GateState) -> DispatchOutcome {
        for (_, observer) in &mut self.gate_changed {
            observer(state);
        }
        DispatchOutcome { observers: self.gate_changed.len(), consumers: 0 }
    }
}
