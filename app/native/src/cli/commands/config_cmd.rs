//! Config CLI commands.

use clap::Subcommand;

use crate::cli::CliError;
use crate::config::{self, config_paths};

/// Config inspection commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Show the configuration search paths.
    ///
    /// Lists every location searched for a configuration file and marks the
    /// one currently in use (if any).
    Path,

    /// Print the effective configuration as JSON.
    ///
    /// Values missing from the file are shown with their defaults.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the output cannot be produced.
pub fn execute(cmd: &ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Path => {
            show_config_path();
            Ok(())
        }
        ConfigCommands::Show => show_config(),
    }
}

fn show_config_path() {
    let active = config::get_config_path();
    if active.is_none() {
        println!("No configuration file in use; defaults apply.");
    }

    for path in config_paths() {
        let marker = if active == Some(&path) { "*" } else { " " };
        println!("{marker} {}", path.display());
    }
    if let Some(path) = active
        && !config_paths().contains(path)
    {
        println!("* {}", path.display());
    }
}

fn show_config() -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(config::get_config())?;
    println!("{json}");
    Ok(())
}
