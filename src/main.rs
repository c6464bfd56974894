//! Application entry point.
//!
//! Parses command-line arguments, installs the stderr logger, and delegates
//! execution to [`runner::run`].

use makehelper::{cli::Cli, config, runner};
use std::process::ExitCode;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = match Cli::try_parse_legacy(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => err.exit(),
    };
    fmt()
        .with_max_level(config::log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    match runner::run(&cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        Err(err) => {
            let message = format!("{err:#}");
            tracing::error!(error = %message, "makehelper failed");
            ExitCode::FAILURE
        }
    }
}
