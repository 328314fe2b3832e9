//! CLI module for the interception engine.
//!
//! The binary has no live host to attach to. It drives the engine against a
//! simulated host from a recorded trace, and inspects configuration.

mod commands;

use std::io;
use std::path::PathBuf;

use clap::Parser;
pub use commands::Cli;
pub use commands::replay::{ReplaySummary, Trace, replay};
use thiserror::Error;

use crate::error::EngineError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read trace {}: {source}", path.display())]
    TraceIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse trace: {0}")]
    TraceParse(#[from] serde_json::Error),

    #[error("Invalid trace: {0}")]
    InvalidTrace(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Process exit code: 2 when the interception points could not be
    /// installed, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(err) if err.is_install_error() => 2,
            _ => 1,
        }
    }
}

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    cli.execute()
}
