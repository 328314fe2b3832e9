//! Press-duration tracking that turns press/release pairs into clicks.
//!
//! Each button runs `Idle -> Pressed (timer started) -> Released`. The timer
//! carries the press duration across ticks, so presses and releases may be
//! any number of ticks apart.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::input::{MouseButton, MouseState};

/// A press shorter than this (and longer than zero) is a click.
pub const CLICK_THRESHOLD: Duration = Duration::from_millis(150);

/// Outcome of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Released within the click window.
    Click(Duration),
    /// Released after zero time or after the click window closed.
    NotClick(Duration),
    /// Released without a tracked press; nothing can be said.
    Unknown,
}

impl Classification {
    /// Classifies a measured press duration.
    ///
    /// Durations are compared in whole milliseconds: `0 < ms < 150` is a click.
    #[must_use]
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let ms = elapsed.as_millis();
        if ms > 0 && ms < CLICK_THRESHOLD.as_millis() {
            Self::Click(elapsed)
        } else {
            Self::NotClick(elapsed)
        }
    }

    #[must_use]
    pub const fn is_click(self) -> bool { matches!(self, Self::Click(_)) }
}

/// What happened to one button this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonDelta {
    pub button: MouseButton,
    /// The button went down this tick and its timer was (re)started.
    pub pressed: bool,
    /// `Some` when the button was released this tick.
    pub release: Option<Classification>,
}

impl ButtonDelta {
    #[must_use]
    pub const fn is_released(&self) -> bool { self.release.is_some() }

    #[must_use]
    pub fn is_click(&self) -> bool { self.release.is_some_and(Classification::is_click) }
}

/// Per-button press timers.
#[derive(Debug, Default)]
pub struct ClickClassifier {
    timers: HashMap<MouseButton, Option<Instant>>,
}

impl ClickClassifier {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Starts the timer for `button`, replacing any unconsumed one.
    pub fn press(&mut self, button: MouseButton, now: Instant) {
        self.timers.insert(button, Some(now));
    }

    /// Consumes the timer for `button` and classifies the press.
    pub fn release(&mut self, button: MouseButton, now: Instant) -> Classification {
        self.timers
            .get_mut(&button)
            .and_then(Option::take)
            .map_or(Classification::Unknown, |started| {
                Classification::from_elapsed(now.saturating_duration_since(started))
            })
    }

    /// Returns whether `button` has a live timer.
    #[must_use]
    pub fn is_tracking(&self, button: MouseButton) -> bool {
        self.timers.get(&button).is_some_and(Option::is_some)
    }

    /// Computes the delta for `button` between `previous` and `current`.
    pub fn observe(
        &mut self,
        button: MouseButton,
        current: &MouseState,
        previous: &MouseState,
        now: Instant,
    ) -> ButtonDelta {
        self.timers.entry(button).or_insert(None);

        let pressed = current.is_clicked(button);
        if pressed {
            self.press(button, now);
        }

        let released = previous.is_pressed(button) && !current.is_pressed(button);
        let release = released.then(|| self.release(button, now));

        ButtonDelta { button, pressed, release }
    }
}
