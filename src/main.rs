//! Keel - Unix daemon host for long-running applications.
//!
//! Main entry point for the keeld control binary.

mod adapters;
mod cli;
mod cmd_daemon;
mod heartbeat;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

/// Initialize console tracing on stderr.
///
/// Console only: a background logging worker must not exist before the
/// double fork, and the daemon's stderr is redirected to the configured
/// file anyway, so file logging arrives via stream redirection.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let code = cmd_daemon::handle_command(cli.command, cli.pid_file);
    std::process::exit(code);
}
