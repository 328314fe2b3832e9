//! CLI command definitions using Clap.
//!
//! - `config_cmd` - configuration inspection
//! - `replay` - trace replay against a simulated host

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::CliError;
use crate::{config, logging};

pub mod config_cmd;
pub mod replay;

pub use config_cmd::ConfigCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// input-intercept - replay and inspect the input interception engine.
#[derive(Parser, Debug)]
#[command(name = "input-intercept")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH", env = "INPUT_INTERCEPT_CONFIG")]
    pub config: Option<String>,

    /// Enable debug logging on stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Replay a recorded input trace through the engine.
    ///
    /// Each tick of the trace is fed to the engine as host input, against a
    /// simulated hooking layer. Every dispatched occurrence is printed to
    /// stdout as one JSON object per line.
    #[command(after_long_help = r#"Examples:
  input-intercept replay trace.jsonc
  input-intercept -v replay trace.jsonc 2> engine.log"#)]
    Replay {
        /// Path to the JSONC trace file.
        #[arg(value_name = "TRACE")]
        trace: PathBuf,
    },

    /// Configuration file commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Cli {
    /// Executes the parsed command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub fn execute(&self) -> Result<(), CliError> {
        if let Some(path) = &self.config {
            config::set_custom_config_path(PathBuf::from(path));
        }

        let engine_config = config::init();
        logging::init(logging::default_level(&engine_config.log_level, self.verbose));

        match &self.command {
            Commands::Replay { trace } => {
                let trace = replay::read_trace(trace)?;
                let mut stdout = std::io::stdout().lock();
                let summary = replay::replay(&trace, engine_config.clone(), &mut stdout)?;
                tracing::info!(
                    ticks = summary.ticks,
                    occurrences = summary.occurrences,
                    consumed = summary.consumed,
                    "replay: finished"
                );
                Ok(())
            }
            Commands::Config(cmd) => config_cmd::execute(cmd),
        }
    }
}
