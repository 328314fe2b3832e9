//! Per-tick input interception engine.
//!
//! [`InputEngine`] runs after the host's own per-tick input routine. Each tick
//! it mirrors the mouse block, classifies button transitions into clicks and
//! presses, fans them out to observers, and writes any suppression back into
//! the host blocks so the host never sees consumed input. It then drains the
//! host's key queue the same way. A second entry point forwards key-release
//! messages to non-cancellable observers.
//!
//! Nothing runs while the [`ModeGate`] is closed.
//!
//! # Dispatch order
//!
//! Per button, in mask order: `MouseClicked`, then `MousePressed` for the
//! release edge, then `MousePressed` for the press edge. Each step sees the
//! suppressions made by earlier steps. The mirror rotates once at the end of
//! the mouse pass, after which the key queue is processed.

pub mod classifier;
pub mod dispatch;
pub mod gate;
pub mod mirror;
pub mod queue;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

pub use classifier::{ButtonDelta, CLICK_THRESHOLD, Classification, ClickClassifier};
pub use dispatch::{
    ButtonPhase, DispatchOutcome, Dispatcher, EventKind, MouseOccurrence, Observer, Occurrence,
    SubscriptionToken,
};
pub use gate::{GateState, GateTracker, ModeGate, flag_gate};
pub use mirror::StateMirror;
pub use queue::{MAX_QUEUE_ENTRIES, QueueStats};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::hook::{CallSiteLocator, DetourBackend, InterceptionPoint, intercept};
use crate::input::{
    ButtonBits, HostKeyMap, HostKeyboard, HostMouse, KeyEvent, MouseButton, VirtualKey,
};

/// Host message code for a key release.
pub const KEY_RELEASED_MESSAGE: u32 = 257;

/// Host keyboard blocks for one tick.
pub struct KeyboardFrame<'a> {
    /// The discrete queue together with its own key map.
    pub queue: &'a mut dyn HostKeyboard,
    /// The host's parallel key-state map.
    pub key_state: &'a mut dyn HostKeyMap,
}

/// Host blocks handed to one tick. Absent blocks are skipped.
#[derive(Default)]
pub struct InputFrame<'a> {
    pub mouse: Option<&'a mut dyn HostMouse>,
    pub keyboard: Option<KeyboardFrame<'a>>,
}

impl<'a> InputFrame<'a> {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_mouse(mut self, mouse: &'a mut dyn HostMouse) -> Self {
        self.mouse = Some(mouse);
        self
    }

    #[must_use]
    pub fn with_keyboard(
        mut self,
        queue: &'a mut dyn HostKeyboard,
        key_state: &'a mut dyn HostKeyMap,
    ) -> Self {
        self.keyboard = Some(KeyboardFrame { queue, key_state });
        self
    }
}

/// One dispatched occurrence and what the observers did with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatched {
    pub occurrence: Occurrence,
    pub outcome: DispatchOutcome,
}

/// Summary of one processed tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Occurrences in dispatch order.
    pub occurrences: Vec<Dispatched>,
    /// Key queue counters.
    pub queue: QueueStats,
}

impl TickReport {
    /// Number of occurrences of `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.occurrences.iter().filter(|d| d.occurrence.kind() == kind).count()
    }

    /// Number of occurrences at least one observer consumed.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.occurrences.iter().filter(|d| d.outcome.is_consumed()).count()
    }

    /// The bare occurrences, in dispatch order.
    pub fn kinds(&self) -> impl Iterator<Item = Occurrence> + '_ {
        self.occurrences.iter().map(|d| d.occurrence)
    }
}

fn log_occurrence(verbose: bool, occurrence: Occurrence, outcome: DispatchOutcome) {
    if verbose {
        tracing::debug!(
            occurrence = %occurrence,
            observers = outcome.observers,
            consumed = outcome.is_consumed(),
            "input: dispatched"
        );
    } else {
        tracing::trace!(
            occurrence = %occurrence,
            observers = outcome.observers,
            consumed = outcome.is_consumed(),
            "input: dispatched"
        );
    }
}

/// The interception engine.
///
/// Owns the state mirror, click timers and observer lists. The engine is
/// driven from the host's input thread; wrap it in a mutex if observers are
/// (un)subscribed from elsewhere.
pub struct InputEngine {
    config: EngineConfig,
    gate: Box<dyn ModeGate>,
    gate_tracker: GateTracker,
    clock: Box<dyn Clock>,
    mirror: StateMirror,
    classifier: ClickClassifier,
    dispatcher: Dispatcher,
    input_point: Option<InterceptionPoint>,
    key_message_point: Option<InterceptionPoint>,
    last_fault: Option<EngineError>,
}

impl std::fmt::Debug for InputEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputEngine")
            .field("gate_active", &self.gate_tracker.is_active())
            .field("mirror", &self.mirror)
            .field("dispatcher", &self.dispatcher)
            .field("input_point", &self.input_point)
            .field("key_message_point", &self.key_message_point)
            .finish_non_exhaustive()
    }
}

impl InputEngine {
    /// Creates an engine using the system clock. No hooks are installed yet.
    pub fn new(gate: impl ModeGate + 'static, config: EngineConfig) -> Self {
        Self {
            config,
            gate: Box::new(gate),
            gate_tracker: GateTracker::default(),
            clock: Box::new(SystemClock),
            mirror: StateMirror::new(),
            classifier: ClickClassifier::new(),
            dispatcher: Dispatcher::new(),
            input_point: None,
            key_message_point: None,
            last_fault: None,
        }
    }

    /// Replaces the time source used for press durations.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Installs and enables both interception points.
    ///
    /// Does nothing when the configuration disables interception. A failure
    /// part-way leaves whatever was installed in place; call [`dispose`] to
    /// remove it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyInitialized`] if points are installed,
    /// [`EngineError::LocationNotFound`] if a call site cannot be located and
    /// [`EngineError::HookInstall`] if the backend fails.
    ///
    /// [`dispose`]: InputEngine::dispose
    pub fn init(
        &mut self,
        locator: &dyn CallSiteLocator,
        backend: &mut dyn DetourBackend,
    ) -> EngineResult<()> {
        if self.input_point.is_some() || self.key_message_point.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        if !self.config.enabled {
            tracing::info!("input: interception disabled by configuration");
            return Ok(());
        }

        let site = self.config.call_sites.input_site();
        self.input_point
            .insert(InterceptionPoint::install(site, locator, backend)?)
            .enable()?;

        let site = self.config.call_sites.key_message_site();
        self.key_message_point
            .insert(InterceptionPoint::install(site, locator, backend)?)
            .enable()?;

        tracing::info!("input: interception points enabled");
        Ok(())
    }

    /// Disables and removes both interception points, last installed first.
    ///
    /// Safe to call repeatedly and after a failed [`init`](InputEngine::init).
    pub fn dispose(&mut self) {
        let had_points = self.input_point.is_some() || self.key_message_point.is_some();
        if let Some(mut point) = self.key_message_point.take() {
            point.dispose();
        }
        if let Some(mut point) = self.input_point.take() {
            point.dispose();
        }
        if had_points {
            tracing::info!("input: interception points removed");
        }
    }

    /// Returns whether both interception points are installed and enabled.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.input_point.as_ref().is_some_and(InterceptionPoint::is_enabled)
            && self.key_message_point.as_ref().is_some_and(InterceptionPoint::is_enabled)
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Registers an observer at the end of its kind's list.
    pub fn subscribe(&mut self, observer: Observer) -> SubscriptionToken {
        self.dispatcher.subscribe(observer)
    }

    /// Removes an observer. Returns `false` if the token was already removed.
    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.dispatcher.unsubscribe(token)
    }

    pub fn on_mouse_clicked(
        &mut self,
        observer: impl FnMut(&MouseOccurrence) -> bool + Send + 'static,
    ) -> SubscriptionToken {
        self.subscribe(Observer::MouseClicked(Box::new(observer)))
    }

    pub fn on_mouse_pressed(
        &mut self,
        observer: impl FnMut(&MouseOccurrence) -> bool + Send + 'static,
    ) -> SubscriptionToken {
        self.subscribe(Observer::MousePressed(Box::new(observer)))
    }

    pub fn on_key_pressed(
        &mut self,
        observer: impl FnMut(&KeyEvent) -> bool + Send + 'static,
    ) -> SubscriptionToken {
        self.subscribe(Observer::KeyPressed(Box::new(observer)))
    }

    pub fn on_key_released(
        &mut self,
        observer: impl FnMut(VirtualKey) + Send + 'static,
    ) -> SubscriptionToken {
        self.subscribe(Observer::KeyReleased(Box::new(observer)))
    }

    pub fn on_gate_changed(
        &mut self,
        observer: impl FnMut(GateState) + Send + 'static,
    ) -> SubscriptionToken {
        self.subscribe(Observer::GateChanged(Box::new(observer)))
    }

    #[must_use]
    pub fn observer_count(&self, kind: EventKind) -> usize { self.dispatcher.observer_count(kind) }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Body of the per-tick input detour.
    ///
    /// Runs `original` first, then processes the tick against `frame`, and
    /// returns the original's result unchanged.
    pub fn handle_input<R>(&mut self, original: impl FnOnce() -> R, frame: InputFrame<'_>) -> R {
        intercept(original, || {
            self.process_tick(frame);
        })
    }

    /// Body of the key-message detour.
    ///
    /// Runs `original` first; if the message is a key release, notifies
    /// release observers. Returns the original's result unchanged.
    pub fn handle_key_message<R>(
        &mut self,
        original: impl FnOnce() -> R,
        message: u32,
        key_param: u64,
    ) -> R {
        intercept(original, || {
            self.process_key_message(message, key_param);
        })
    }

    /// Processes one tick. Returns `None` if the gate is closed or the tick
    /// was aborted by a fault.
    pub fn process_tick(&mut self, frame: InputFrame<'_>) -> Option<TickReport> {
        if !self.observe_gate() {
            return None;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| {
            let now = self.clock.now();
            self.tick(frame, now)
        })) {
            Ok(report) => Some(report),
            Err(payload) => {
                self.record_fault(payload.as_ref(), "tick");
                None
            }
        }
    }

    /// Processes one key message. Returns the release occurrence and its
    /// outcome if observers were notified.
    pub fn process_key_message(&mut self, message: u32, key_param: u64) -> Option<Dispatched> {
        if !self.observe_gate() || message != KEY_RELEASED_MESSAGE {
            return None;
        }
        let Some(key) = VirtualKey::from_raw(key_param) else {
            tracing::debug!(key_param, "input: key message outside key range ignored");
            return None;
        };

        let dispatcher = &mut self.dispatcher;
        match panic::catch_unwind(AssertUnwindSafe(|| dispatcher.notify_key_released(key))) {
            Ok(outcome) => {
                let occurrence = Occurrence::KeyReleased(key);
                log_occurrence(self.config.trace_occurrences, occurrence, outcome);
                Some(Dispatched { occurrence, outcome })
            }
            Err(payload) => {
                self.record_fault(payload.as_ref(), "key message");
                None
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub const fn config(&self) -> &EngineConfig { &self.config }

    #[must_use]
    pub const fn mirror(&self) -> &StateMirror { &self.mirror }

    #[must_use]
    pub const fn classifier(&self) -> &ClickClassifier { &self.classifier }

    /// Returns the last processing fault, if any, and clears it.
    pub const fn take_fault(&mut self) -> Option<EngineError> { self.last_fault.take() }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Consults the gate and notifies gate observers on a transition.
    ///
    /// A panicking gate counts as closed for this call and leaves the tracked
    /// state untouched.
    fn observe_gate(&mut self) -> bool {
        let gate = &self.gate;
        let active = match panic::catch_unwind(AssertUnwindSafe(|| gate.is_active())) {
            Ok(active) => active,
            Err(payload) => {
                self.record_fault(payload.as_ref(), "gate");
                return false;
            }
        };
        if let Some(state) = self.gate_tracker.observe(active) {
            tracing::info!(state = ?state, "input: mode gate changed");
            let dispatcher = &mut self.dispatcher;
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.notify_gate(state))) {
                self.record_fault(payload.as_ref(), "gate notification");
            }
        }
        active
    }

    fn record_fault(&mut self, payload: &(dyn Any + Send), stage: &str) {
        let err = EngineError::from_panic(payload);
        tracing::error!(stage, error = %err, "input: processing aborted, remaining work skipped");
        self.last_fault = Some(err);
    }

    fn tick(&mut self, frame: InputFrame<'_>, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if let Some(mouse) = frame.mouse {
            self.process_mouse(mouse, now, &mut report);
        }

        if let Some(keyboard) = frame.keyboard {
            let verbose = self.config.trace_occurrences;
            let occurrences = &mut report.occurrences;
            let stats = queue::drain(
                &mut self.dispatcher,
                &mut self.mirror,
                keyboard.queue,
                keyboard.key_state,
                |occurrence, outcome| {
                    log_occurrence(verbose, occurrence, outcome);
                    occurrences.push(Dispatched { occurrence, outcome });
                },
            );
            report.queue = stats;
        }

        report
    }

    fn process_mouse(&mut self, host: &mut dyn HostMouse, now: Instant, report: &mut TickReport) {
        self.mirror.update(host.read());

        for button in MouseButton::all().iter() {
            let delta =
                self.classifier.observe(button, self.mirror.current(), self.mirror.previous(), now);

            if delta.is_click() {
                self.dispatch_mouse(host, Occurrence::MouseClicked(button), ButtonBits::all(), report);
            }

            // Re-evaluated: a consumed click clears the release edge.
            if self.mirror.is_released(button) {
                let occurrence = Occurrence::MousePressed(button, ButtonPhase::Up);
                self.dispatch_mouse(host, occurrence, ButtonBits::PRESSED, report);
            }

            if self.mirror.current().is_clicked(button) {
                let occurrence = Occurrence::MousePressed(button, ButtonPhase::Down);
                self.dispatch_mouse(host, occurrence, ButtonBits::CLICKED, report);
            }
        }

        self.mirror.commit();
    }

    /// Dispatches a mouse occurrence, clearing `bits` in the host block and
    /// the mirror for every consuming observer.
    fn dispatch_mouse(
        &mut self,
        host: &mut dyn HostMouse,
        occurrence: Occurrence,
        bits: ButtonBits,
        report: &mut TickReport,
    ) {
        let Some(button) = occurrence.button() else {
            return;
        };

        let mirror = &mut self.mirror;
        let state = *mirror.current();
        let outcome = self.dispatcher.dispatch_mouse(occurrence, state, || {
            host.clear(button, bits);
            mirror.suppress(button, bits);
            *mirror.current()
        });

        log_occurrence(self.config.trace_occurrences, occurrence, outcome);
        report.occurrences.push(Dispatched { occurrence, outcome });
    }
}

impl Drop for InputEngine {
    fn drop(&mut self) { self.dispose(); }
}
