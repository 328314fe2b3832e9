//! Trace replay against a simulated host.
//!
//! A trace is a JSONC document describing what the host would hand the engine
//! tick by tick, plus a list of scripted consumers:
//!
//! ```jsonc
//! {
//!   "consumers": [
//!     { "kind": "mouseClicked", "button": "left" },
//!     { "kind": "keyPressed", "key": 65 }
//!   ],
//!   "ticks": [
//!     { "atMs": 0, "mouse": { "pressed": ["left"], "clicked": ["left"] } },
//!     { "atMs": 80, "mouse": {} },
//!     { "atMs": 96, "keys": { "events": [{ "key": 65, "kind": "pressed" }] } },
//!     { "atMs": 120, "messages": [{ "code": 257, "key": 65 }] },
//!     { "atMs": 200, "gate": false }
//!   ]
//! }
//! ```
//!
//! Omitted mouse or key blocks are read as idle. The gate starts open and
//! keeps its last value until a tick changes it.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};

use crate::cli::CliError;
use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::engine::{
    ButtonPhase, Dispatched, InputEngine, InputFrame, KEY_RELEASED_MESSAGE, Occurrence, flag_gate,
};
use crate::input::{KeyEvent, KeyEventKind, KeyMap, KeyboardState, MouseButton, MouseState, VirtualKey};
use crate::sim::SimulatedHost;

/// A recorded input session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Trace {
    pub consumers: Vec<ConsumerSpec>,
    pub ticks: Vec<TraceTick>,
}

/// A scripted observer that consumes matching occurrences.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConsumerSpec {
    MouseClicked {
        button: String,
    },
    MousePressed {
        button: String,
        /// Restricts consumption to one edge; both when absent.
        #[serde(default)]
        phase: Option<ButtonPhase>,
    },
    KeyPressed {
        key: u8,
    },
}

/// Host state for one tick.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraceTick {
    /// Milliseconds since the start of the trace. Must not decrease.
    pub at_ms: u64,
    /// New gate value, if it changes on this tick.
    pub gate: Option<bool>,
    pub mouse: TraceMouse,
    pub keys: TraceKeys,
    /// Key messages delivered after the tick.
    pub messages: Vec<TraceMessage>,
}

/// Mouse block for one tick, as button labels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TraceMouse {
    pub pressed: Vec<String>,
    pub clicked: Vec<String>,
}

/// Key queue for one tick.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TraceKeys {
    pub events: Vec<TraceKeyEvent>,
    /// Reported queue count; defaults to the number of events.
    pub count: Option<i32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TraceKeyEvent {
    pub key: u8,
    pub kind: KeyEventKind,
}

/// A raw key message handed to the key-message entry point.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TraceMessage {
    #[serde(default = "default_message_code")]
    pub code: u32,
    pub key: u64,
}

const fn default_message_code() -> u32 { KEY_RELEASED_MESSAGE }

/// Totals for a finished replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub ticks: usize,
    pub occurrences: usize,
    pub consumed: usize,
    pub faults: usize,
}

/// Reads and parses a JSONC trace file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid trace.
pub fn read_trace(path: &Path) -> Result<Trace, CliError> {
    let file = fs::File::open(path)
        .map_err(|source| CliError::TraceIo { path: path.to_path_buf(), source })?;
    let reader = json_comments::StripComments::new(file);
    Ok(serde_json::from_reader(reader)?)
}

fn parse_buttons(labels: &[String]) -> Result<MouseButton, CliError> {
    labels.iter().try_fold(MouseButton::empty(), |mask, label| {
        MouseButton::from_label(label)
            .map(|button| mask | button)
            .ok_or_else(|| CliError::InvalidTrace(format!("unknown mouse button '{label}'")))
    })
}

fn button_labels(mask: MouseButton) -> Vec<&'static str> { mask.iter().map(MouseButton::label).collect() }

fn subscribe_consumers(engine: &mut InputEngine, consumers: &[ConsumerSpec]) -> Result<(), CliError> {
    for consumer in consumers {
        match consumer {
            ConsumerSpec::MouseClicked { button } => {
                let target = parse_buttons(std::slice::from_ref(button))?;
                engine.on_mouse_clicked(move |occ| occ.button == target);
            }
            ConsumerSpec::MousePressed { button, phase } => {
                let target = parse_buttons(std::slice::from_ref(button))?;
                let phase = *phase;
                engine.on_mouse_pressed(move |occ| {
                    occ.button == target && phase.is_none_or(|phase| phase == occ.phase)
                });
            }
            ConsumerSpec::KeyPressed { key } => {
                let target = VirtualKey(*key);
                engine.on_key_pressed(move |event| event.key == target);
            }
        }
    }
    Ok(())
}

/// Writes a `fault` line for the engine's last fault. Faults the engine does
/// not recover from end the replay.
fn report_fault(
    engine: &mut InputEngine,
    summary: &mut ReplaySummary,
    tick: usize,
    at_ms: u64,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let Some(fault) = engine.take_fault() else {
        return Ok(());
    };
    if !fault.is_recoverable() {
        return Err(fault.into());
    }
    summary.faults += 1;
    write_line(out, &json!({ "tick": tick, "atMs": at_ms, "fault": fault.to_string() }))
}

fn occurrence_json(tick: usize, at_ms: u64, dispatched: &Dispatched) -> Value {
    let mut line = json!({
        "tick": tick,
        "atMs": at_ms,
        "event": dispatched.occurrence.kind().as_str(),
        "observers": dispatched.outcome.observers,
        "consumed": dispatched.outcome.is_consumed(),
    });
    match dispatched.occurrence {
        Occurrence::MouseClicked(button) => {
            line["button"] = json!(button.label());
        }
        Occurrence::MousePressed(button, phase) => {
            line["button"] = json!(button.label());
            line["phase"] = json!(phase);
        }
        Occurrence::KeyPressed(event) => {
            line["key"] = json!(event.key);
            line["kind"] = json!(event.kind);
        }
        Occurrence::KeyReleased(key) => {
            line["key"] = json!(key);
        }
    }
    line
}

fn write_line(out: &mut impl Write, value: &Value) -> Result<(), CliError> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Replays `trace` through a fresh engine and writes one JSON line per
/// occurrence to `out`.
///
/// Each tick also emits a `hostMouse` line when observers changed the host
/// mouse block, and a `fault` line when processing was aborted.
///
/// # Errors
///
/// Returns an error if the trace is inconsistent, the engine cannot be
/// initialized, or output cannot be written.
pub fn replay(trace: &Trace, config: EngineConfig, out: &mut impl Write) -> Result<ReplaySummary, CliError> {
    let gate = Arc::new(AtomicBool::new(true));
    let clock = ManualClock::new();
    let mut engine = InputEngine::new(flag_gate(&gate), config).with_clock(clock.clone());

    let mut host = SimulatedHost::new();
    engine.init(&host.clone(), &mut host)?;
    subscribe_consumers(&mut engine, &trace.consumers)?;

    let mut summary = ReplaySummary::default();
    let mut last_ms = 0;
    for (index, tick) in trace.ticks.iter().enumerate() {
        if tick.at_ms < last_ms {
            return Err(CliError::InvalidTrace(format!(
                "tick {index} at {}ms is earlier than the previous tick at {last_ms}ms",
                tick.at_ms
            )));
        }
        clock.advance_ms(tick.at_ms - last_ms);
        last_ms = tick.at_ms;

        if let Some(active) = tick.gate {
            gate.store(active, Ordering::Release);
        }

        let mut mouse = MouseState {
            pressed: parse_buttons(&tick.mouse.pressed)?,
            clicked: parse_buttons(&tick.mouse.clicked)?,
            ..MouseState::default()
        };
        let before = mouse;

        let mut keyboard = KeyboardState::with_queue(
            tick.keys.events.iter().map(|e| KeyEvent::new(VirtualKey(e.key), e.kind)),
        );
        if let Some(count) = tick.keys.count {
            keyboard.queue_count = count;
        }
        let mut key_state = KeyMap::default();
        for event in &tick.keys.events {
            keyboard.key_map.set(VirtualKey(event.key), 1);
            key_state.set(VirtualKey(event.key), 1);
        }

        let frame = InputFrame::new()
            .with_mouse(&mut mouse)
            .with_keyboard(&mut keyboard, &mut key_state);
        let report = engine.process_tick(frame);

        report_fault(&mut engine, &mut summary, index, tick.at_ms, out)?;

        if let Some(report) = report {
            for dispatched in &report.occurrences {
                summary.occurrences += 1;
                if dispatched.outcome.is_consumed() {
                    summary.consumed += 1;
                }
                write_line(out, &occurrence_json(index, tick.at_ms, dispatched))?;
            }
        }

        if mouse != before {
            write_line(
                out,
                &json!({
                    "tick": index,
                    "atMs": tick.at_ms,
                    "hostMouse": {
                        "pressed": button_labels(mouse.pressed),
                        "clicked": button_labels(mouse.clicked),
                    },
                }),
            )?;
        }

        for message in &tick.messages {
            if let Some(dispatched) = engine.process_key_message(message.code, message.key) {
                summary.occurrences += 1;
                write_line(out, &occurrence_json(index, tick.at_ms, &dispatched))?;
            }
            report_fault(&mut engine, &mut summary, index, tick.at_ms, out)?;
        }

        summary.ticks += 1;
    }

    engine.dispose();
    Ok(summary)
}
