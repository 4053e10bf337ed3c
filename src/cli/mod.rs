//! Command-line interface for OCS operations.
//!
//! The module separates:
//! - Command definitions ([`commands`])
//! - Business logic ([`handlers`])
//! - Output formatting and file I/O ([`output`])
//!
//! # Usage
//!
//! The CLI can be invoked programmatically:
//!
//! ```rust,ignore
//! use ocs::cli;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     cli::run()
//! }
//! ```

pub mod commands;
mod handlers;
pub mod output;

use clap::Parser;
use commands::Cli;

/// Run the CLI application.
///
/// Parses arguments, installs the tracing subscriber, and dispatches to
/// the appropriate handler. Returning an error makes the process exit
/// with status 1.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    handlers::execute(cli)
}
