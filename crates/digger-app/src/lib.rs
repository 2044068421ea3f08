//! Digger application shell
//!
//! Wires configuration, logging and the service objects together for the
//! `digger` binary. Search and marketplace logic live in the `crates/`
//! directory.

pub mod cli;
pub mod state;

pub use cli::{run_command, Cli, Commands};
pub use state::AppServices;

/// Initialize tracing subscriber for logging
///
/// `RUST_LOG` wins over `default_filter`. Output goes to stderr so command
/// results on stdout stay machine-readable.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
