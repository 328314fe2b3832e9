//! End-to-end scenarios for the interception engine.
//!
//! Each test drives an `InputEngine` the way the host glue would: one
//! `handle_input`/`process_tick` call per host tick with the host's own mouse
//! and keyboard blocks, time supplied by a `ManualClock`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use input_intercept::clock::{Clock, ManualClock};
use input_intercept::config::EngineConfig;
use input_intercept::engine::{
    ButtonPhase, EventKind, GateState, InputEngine, InputFrame, KEY_RELEASED_MESSAGE,
    MAX_QUEUE_ENTRIES, Occurrence, flag_gate,
};
use input_intercept::error::EngineError;
use input_intercept::input::{
    KeyEvent, KeyEventKind, KeyMap, KeyboardState, MouseButton, MouseState, VirtualKey,
};
use input_intercept::sim::SimulatedHost;
use parking_lot::Mutex;

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    engine: InputEngine,
    clock: ManualClock,
    gate: Arc<AtomicBool>,
    host: SimulatedHost,
}

impl Harness {
    fn new() -> Self {
        let gate = Arc::new(AtomicBool::new(true));
        let clock = ManualClock::new();
        let mut engine = InputEngine::new(flag_gate(&gate), EngineConfig::default())
            .with_clock(clock.clone());
        let mut host = SimulatedHost::new();
        engine.init(&host.clone(), &mut host).unwrap();
        Self { engine, clock, gate, host }
    }

    /// Runs one tick against `mouse` and returns the occurrences dispatched.
    fn mouse_tick(&mut self, mouse: &mut MouseState) -> Vec<Occurrence> {
        self.engine
            .process_tick(InputFrame::new().with_mouse(mouse))
            .map(|report| report.kinds().collect())
            .unwrap_or_default()
    }
}

fn down(button: MouseButton) -> MouseState {
    MouseState { pressed: button, clicked: button, ..MouseState::default() }
}

fn held(button: MouseButton) -> MouseState {
    MouseState { pressed: button, ..MouseState::default() }
}

fn idle() -> MouseState { MouseState::default() }

fn counter() -> (Arc<Mutex<usize>>, impl FnMut() + Send + 'static) {
    let count = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&count);
    (count, move || *sink.lock() += 1)
}

// ============================================================================
// Click classification
// ============================================================================

#[test]
fn test_quick_press_and_release_is_one_click() {
    let mut h = Harness::new();
    let clicks = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&clicks);
    h.engine.on_mouse_clicked(move |occ| {
        sink.lock().push(occ.button);
        false
    });

    let mut mouse = down(MouseButton::LEFT);
    h.mouse_tick(&mut mouse);
    h.clock.advance_ms(16);
    let mut mouse = held(MouseButton::LEFT);
    h.mouse_tick(&mut mouse);
    h.clock.advance_ms(64);
    let mut mouse = idle();
    let occurrences = h.mouse_tick(&mut mouse);

    assert_eq!(*clicks.lock(), vec![MouseButton::LEFT]);
    assert_eq!(
        occurrences,
        vec![
            Occurrence::MouseClicked(MouseButton::LEFT),
            Occurrence::MousePressed(MouseButton::LEFT, ButtonPhase::Up),
        ]
    );
    assert!(!h.engine.classifier().is_tracking(MouseButton::LEFT));
}

#[test]
fn test_click_without_observers_leaves_host_untouched() {
    let mut h = Harness::new();

    let mut mouse = down(MouseButton::RIGHT);
    h.mouse_tick(&mut mouse);
    assert_eq!(mouse, down(MouseButton::RIGHT));

    h.clock.advance_ms(80);
    let mut mouse = idle();
    let occurrences = h.mouse_tick(&mut mouse);

    assert!(occurrences.contains(&Occurrence::MouseClicked(MouseButton::RIGHT)));
    assert_eq!(mouse, idle());
}

#[test]
fn test_long_hold_is_not_a_click() {
    let mut h = Harness::new();
    let (clicks, mut bump) = counter();
    h.engine.on_mouse_clicked(move |_| {
        bump();
        false
    });

    let mut mouse = down(MouseButton::LEFT);
    h.mouse_tick(&mut mouse);
    for _ in 0..10 {
        h.clock.advance_ms(30);
        let mut mouse = held(MouseButton::LEFT);
        h.mouse_tick(&mut mouse);
    }
    let mut mouse = idle();
    let occurrences = h.mouse_tick(&mut mouse);

    assert_eq!(*clicks.lock(), 0);
    assert_eq!(occurrences, vec![Occurrence::MousePressed(MouseButton::LEFT, ButtonPhase::Up)]);
    assert!(!h.engine.classifier().is_tracking(MouseButton::LEFT));
}

#[test]
fn test_click_window_edges() {
    for (elapsed, expect_click) in [(0, false), (1, true), (149, true), (150, false)] {
        let mut h = Harness::new();
        let mut mouse = down(MouseButton::MIDDLE);
        h.mouse_tick(&mut mouse);
        h.clock.advance_ms(elapsed);
        let mut mouse = idle();
        let occurrences = h.mouse_tick(&mut mouse);

        assert_eq!(
            occurrences.contains(&Occurrence::MouseClicked(MouseButton::MIDDLE)),
            expect_click,
            "elapsed {elapsed}ms"
        );
    }
}

#[test]
fn test_release_without_tracked_press_is_not_a_click() {
    let mut h = Harness::new();

    // Held from before the engine started watching: no clicked edge seen.
    let mut mouse = held(MouseButton::BACK);
    assert!(h.mouse_tick(&mut mouse).is_empty());
    h.clock.advance_ms(50);
    let mut mouse = idle();
    let occurrences = h.mouse_tick(&mut mouse);

    assert_eq!(occurrences, vec![Occurrence::MousePressed(MouseButton::BACK, ButtonPhase::Up)]);
}

#[test]
fn test_buttons_are_classified_independently() {
    let mut h = Harness::new();

    let mut mouse = down(MouseButton::LEFT);
    h.mouse_tick(&mut mouse);
    h.clock.advance_ms(40);
    let mut mouse = MouseState {
        pressed: MouseButton::LEFT | MouseButton::RIGHT,
        clicked: MouseButton::RIGHT,
        ..MouseState::default()
    };
    h.mouse_tick(&mut mouse);
    h.clock.advance_ms(200);
    let mut mouse = held(MouseButton::RIGHT);
    let occurrences = h.mouse_tick(&mut mouse);

    // Left was held 240ms: no click. Right is still held.
    assert_eq!(occurrences, vec![Occurrence::MousePressed(MouseButton::LEFT, ButtonPhase::Up)]);
    assert!(h.engine.classifier().is_tracking(MouseButton::RIGHT));
}

// ============================================================================
// Consumption
// ============================================================================

#[test]
fn test_consumed_click_clears_host_and_reaches_every_observer() {
    let mut h = Harness::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    h.engine.on_mouse_clicked(move |_| {
        sink.lock().push("first");
        true
    });
    let sink = Arc::clone(&calls);
    h.engine.on_mouse_clicked(move |occ| {
        sink.lock().push(if occ.state.is_clicked(MouseButton::LEFT) { "second-clicked" } else { "second" });
        false
    });
    let (releases, mut bump) = counter();
    h.engine.on_mouse_pressed(move |occ| {
        if occ.phase == ButtonPhase::Up {
            bump();
        }
        false
    });

    let mut mouse = down(MouseButton::LEFT);
    h.mouse_tick(&mut mouse);
    h.clock.advance_ms(80);
    let mut mouse = idle();
    h.mouse_tick(&mut mouse);

    assert_eq!(*calls.lock(), vec!["first", "second"]);
    assert!(!mouse.is_clicked(MouseButton::LEFT));
    assert!(!mouse.is_pressed(MouseButton::LEFT));
    // The consumed click also removed the release edge.
    assert_eq!(*releases.lock(), 0);
    assert!(!h.engine.mirror().previous().is_pressed(MouseButton::LEFT));
}

#[test]
fn test_consumed_press_edge_hides_clicked_bit() {
    let mut h = Harness::new();
    h.engine.on_mouse_pressed(|occ| occ.phase == ButtonPhase::Down && occ.button == MouseButton::RIGHT);

    let mut mouse = down(MouseButton::LEFT | MouseButton::RIGHT);
    let occurrences = h.mouse_tick(&mut mouse);

    assert_eq!(occurrences.len(), 2);
    assert!(mouse.is_clicked(MouseButton::LEFT));
    assert!(!mouse.is_clicked(MouseButton::RIGHT));
    assert!(mouse.is_pressed(MouseButton::RIGHT));
    assert!(!h.engine.mirror().current().is_clicked(MouseButton::RIGHT));
}

#[test]
fn test_consumed_release_clears_pressed_bit() {
    let mut h = Harness::new();
    h.engine.on_mouse_pressed(|occ| occ.phase == ButtonPhase::Up);

    let mut mouse = down(MouseButton::FORWARD);
    h.mouse_tick(&mut mouse);
    h.clock.advance_ms(500);
    let mut mouse = idle();
    let occurrences = h.mouse_tick(&mut mouse);

    assert_eq!(occurrences, vec![Occurrence::MousePressed(MouseButton::FORWARD, ButtonPhase::Up)]);
    assert!(!h.engine.mirror().previous().is_pressed(MouseButton::FORWARD));
}

#[test]
fn test_unsubscribed_observer_is_not_called() {
    let mut h = Harness::new();
    let (calls, mut bump) = counter();
    let token = h.engine.on_mouse_pressed(move |_| {
        bump();
        true
    });
    assert!(h.engine.unsubscribe(token));
    assert_eq!(h.engine.observer_count(EventKind::MousePressed), 0);

    let mut mouse = down(MouseButton::LEFT);
    h.mouse_tick(&mut mouse);

    assert_eq!(*calls.lock(), 0);
    assert_eq!(mouse, down(MouseButton::LEFT));
}

// ============================================================================
// Key queue and key messages
// ============================================================================

#[test]
fn test_key_queue_is_bounded_and_filtered() {
    let mut h = Harness::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    h.engine.on_key_pressed(move |event| {
        sink.lock().push(event.kind);
        false
    });

    let mut events = vec![
        KeyEvent::new(VirtualKey(0x10), KeyEventKind::AnyKeyHeld),
        KeyEvent::new(VirtualKey(0x11), KeyEventKind::Released),
    ];
    events.extend((0..100).map(|_| KeyEvent::new(VirtualKey(0x41), KeyEventKind::Pressed)));
    let mut queue = KeyboardState::with_queue(events);
    queue.queue_count = 1000;
    let mut key_state = KeyMap::default();

    let report = h
        .engine
        .process_tick(InputFrame::new().with_keyboard(&mut queue, &mut key_state))
        .unwrap();

    assert_eq!(report.queue.read, MAX_QUEUE_ENTRIES);
    assert_eq!(report.queue.skipped, 2);
    assert_eq!(seen.lock().len(), MAX_QUEUE_ENTRIES - 2);
    assert!(seen.lock().iter().all(|kind| *kind == KeyEventKind::Pressed));
}

#[test]
fn test_consumed_key_is_cleared_in_both_maps() {
    let mut h = Harness::new();
    h.engine.on_key_pressed(|event| event.key == VirtualKey(0x57));

    let mut queue = KeyboardState::with_queue([
        KeyEvent::new(VirtualKey(0x57), KeyEventKind::Pressed),
        KeyEvent::new(VirtualKey(0x41), KeyEventKind::Pressed),
    ]);
    queue.key_map.set(VirtualKey(0x57), 0x80);
    queue.key_map.set(VirtualKey(0x41), 0x80);
    let mut key_state = queue.key_map;

    let report = h
        .engine
        .process_tick(InputFrame::new().with_keyboard(&mut queue, &mut key_state))
        .unwrap();

    assert_eq!(report.queue.consumed, 1);
    assert_eq!(report.consumed(), 1);
    assert!(!queue.key_map.is_down(VirtualKey(0x57)));
    assert!(!key_state.is_down(VirtualKey(0x57)));
    assert!(queue.key_map.is_down(VirtualKey(0x41)));
    assert!(key_state.is_down(VirtualKey(0x41)));
}

#[test]
fn test_mouse_is_processed_before_keys() {
    let mut h = Harness::new();
    let mut mouse = down(MouseButton::LEFT);
    let mut queue =
        KeyboardState::with_queue([KeyEvent::new(VirtualKey(0x20), KeyEventKind::Pressed)]);
    let mut key_state = KeyMap::default();

    let report = h
        .engine
        .process_tick(
            InputFrame::new()
                .with_mouse(&mut mouse)
                .with_keyboard(&mut queue, &mut key_state),
        )
        .unwrap();

    let kinds: Vec<_> = report.kinds().map(|occ| occ.kind()).collect();
    assert_eq!(kinds, vec![EventKind::MousePressed, EventKind::KeyPressed]);
}

#[test]
fn test_key_release_messages() {
    let mut h = Harness::new();
    let released = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&released);
    h.engine.on_key_released(move |key| sink.lock().push(key));

    let ret = h.engine.handle_key_message(|| "host result", KEY_RELEASED_MESSAGE, 0x1B);
    h.engine.handle_key_message(|| (), 256, 0x1B);

    assert_eq!(ret, "host result");
    assert_eq!(*released.lock(), vec![VirtualKey(0x1B)]);
}

// ============================================================================
// Gate, hooks and fault isolation
// ============================================================================

#[test]
fn test_original_runs_first_and_result_is_returned() {
    let mut h = Harness::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&order);
    h.engine.on_mouse_pressed(move |_| {
        sink.lock().push("observer");
        false
    });

    let mut mouse = down(MouseButton::LEFT);
    let result = h.engine.handle_input(
        || {
            order.lock().push("original");
            0xC0DE
        },
        InputFrame::new().with_mouse(&mut mouse),
    );

    assert_eq!(result, 0xC0DE);
    assert_eq!(*order.lock(), vec!["original", "observer"]);
}

#[test]
fn test_closed_gate_freezes_everything() {
    let mut h = Harness::new();
    let gates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&gates);
    h.engine.on_gate_changed(move |state| sink.lock().push(state));
    h.engine.on_mouse_pressed(|_| true);
    h.mouse_tick(&mut idle());

    h.gate.store(false, Ordering::Release);
    let mut mouse = down(MouseButton::LEFT);
    let ran = h.engine.handle_input(|| true, InputFrame::new().with_mouse(&mut mouse));

    assert!(ran);
    assert_eq!(mouse, down(MouseButton::LEFT));
    assert!(!h.engine.classifier().is_tracking(MouseButton::LEFT));
    assert_eq!(*h.engine.mirror().current(), idle());

    h.gate.store(true, Ordering::Release);
    h.mouse_tick(&mut mouse);
    assert_eq!(*gates.lock(), vec![GateState::Active, GateState::Inactive, GateState::Active]);
}

#[test]
fn test_observer_panic_aborts_only_that_tick() {
    let mut h = Harness::new();
    let (calls, mut bump) = counter();
    h.engine.on_mouse_pressed(move |occ| {
        assert!(occ.button != MouseButton::MIDDLE, "middle button unsupported");
        bump();
        false
    });

    let mut mouse = down(MouseButton::MIDDLE);
    let result = h.engine.handle_input(|| 5, InputFrame::new().with_mouse(&mut mouse));

    assert_eq!(result, 5);
    assert!(matches!(h.engine.take_fault(), Some(EngineError::ProcessingFault(_))));
    assert_eq!(*calls.lock(), 0);

    h.clock.advance_ms(16);
    let mut mouse = down(MouseButton::LEFT);
    assert!(h.engine.process_tick(InputFrame::new().with_mouse(&mut mouse)).is_some());
    assert_eq!(*calls.lock(), 1);
    assert!(h.engine.take_fault().is_none());
}

#[test]
fn test_panicking_gate_is_contained() {
    let mut engine =
        InputEngine::new(|| -> bool { panic!("gate lookup failed") }, EngineConfig::default());
    let (calls, mut bump) = counter();
    engine.on_mouse_pressed(move |_| {
        bump();
        true
    });
    let gates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&gates);
    engine.on_gate_changed(move |state| sink.lock().push(state));

    let mut mouse = down(MouseButton::LEFT);
    let result = engine.handle_input(|| 7, InputFrame::new().with_mouse(&mut mouse));

    assert_eq!(result, 7);
    assert_eq!(mouse, down(MouseButton::LEFT));
    assert_eq!(
        engine.take_fault(),
        Some(EngineError::ProcessingFault("gate lookup failed".to_string()))
    );

    let ret = engine.handle_key_message(|| "released", KEY_RELEASED_MESSAGE, 0x41);

    assert_eq!(ret, "released");
    assert!(matches!(engine.take_fault(), Some(EngineError::ProcessingFault(_))));
    assert_eq!(*calls.lock(), 0);
    assert!(gates.lock().is_empty());
}

struct BrokenClock;

impl Clock for BrokenClock {
    fn now(&self) -> Instant { panic!("clock unavailable") }
}

#[test]
fn test_panicking_clock_is_contained() {
    let gate = Arc::new(AtomicBool::new(true));
    let mut engine =
        InputEngine::new(flag_gate(&gate), EngineConfig::default()).with_clock(BrokenClock);

    let mut mouse = down(MouseButton::RIGHT);
    let result = engine.handle_input(|| 11, InputFrame::new().with_mouse(&mut mouse));

    assert_eq!(result, 11);
    assert_eq!(
        engine.take_fault(),
        Some(EngineError::ProcessingFault("clock unavailable".to_string()))
    );
    assert_eq!(*engine.mirror().current(), idle());
}

#[test]
fn test_dispose_is_idempotent_and_removes_every_hook() {
    let mut h = Harness::new();
    assert!(h.engine.is_installed());
    assert_eq!(h.host.enabled_sites().len(), 2);

    h.engine.dispose();
    h.engine.dispose();

    assert!(!h.engine.is_installed());
    assert!(h.host.enabled_sites().is_empty());
}

#[test]
fn test_dispose_after_partial_init() {
    let gate = Arc::new(AtomicBool::new(true));
    let mut engine = InputEngine::new(flag_gate(&gate), EngineConfig::default());
    let mut host = SimulatedHost::new().without_site("keyMessage");

    let err = engine.init(&host.clone(), &mut host).unwrap_err();
    assert!(err.is_install_error());
    assert_eq!(host.enabled_sites(), vec!["input"]);

    engine.dispose();
    engine.dispose();
    assert!(host.enabled_sites().is_empty());

    // A fresh init succeeds once the site is resolvable again.
    let mut host = SimulatedHost::new();
    engine.init(&host.clone(), &mut host).unwrap();
    assert!(engine.is_installed());
}
