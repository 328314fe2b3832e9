//! input-intercept command-line front end.
//!
//! Replays recorded input traces through the engine and inspects configuration.

fn main() {
    if let Err(err) = input_intercept::cli::run() {
        eprintln!("input-intercept: {err}");
        std::process::exit(err.exit_code());
    }
}
