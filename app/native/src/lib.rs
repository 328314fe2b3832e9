//! input-intercept - per-tick input interception with cancellable dispatch.
//!
//! The library sits behind two hooks in a host's input pipeline. After the
//! host has read its devices for a tick, the engine classifies mouse button
//! transitions into clicks and presses, fans each occurrence out to ordered
//! observers, and clears the corresponding host state for every occurrence an
//! observer consumes. Queued key events and key-release messages are handled
//! the same way.
//!
//! Hook installation goes through the [`hook`] traits; [`sim`] provides an
//! in-process implementation used by the CLI and tests.

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod hook;
pub mod input;
pub mod logging;
pub mod sim;

pub use engine::{InputEngine, InputFrame, TickReport};
pub use error::{EngineError, EngineResult};
