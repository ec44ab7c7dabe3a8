//! Daemon subcommand handlers for keeld.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use keel_core::{
    ApplicationAccess, ConfigurationProvider, ExitCode, ServiceRegistry, SharedApplicationAccess,
    TelemetrySink,
};
use keel_daemon::{DaemonConfig, DaemonController};
use keel_runtime::{ApplicationRuntime, RunArgs, RuntimeConfig, RuntimeError};

use crate::adapters::{LogTelemetrySink, TomlConfigProvider, default_config_file};
use crate::cli::Command;
use crate::heartbeat::HeartbeatLogic;

/// Handle a daemon subcommand; returns the process exit code.
pub(crate) fn handle_command(command: Command, pid_file: Option<PathBuf>) -> i32 {
    let daemon_config = match pid_file {
        Some(path) => DaemonConfig::new(path),
        None => DaemonConfig::default(),
    };

    match command {
        Command::Start {
            foreground,
            config,
            vars,
            args,
        } => daemon_start(daemon_config.with_detach(!foreground), config, vars, args),
        Command::Stop => daemon_stop(daemon_config),
        Command::Restart { config, vars, args } => {
            daemon_restart(daemon_config, config, vars, args)
        }
        Command::Status { live } => daemon_status(daemon_config, live),
    }
}

/// Build the controller hosting the heartbeat application.
///
/// The full runtime is constructed for every subcommand, so configuration
/// problems surface the same way regardless of the action taken.
fn build_controller(
    daemon_config: DaemonConfig,
    config_file: Option<PathBuf>,
) -> Result<DaemonController, RuntimeError> {
    let registry = Arc::new(ServiceRegistry::new());

    let access = Arc::new(SharedApplicationAccess::new());
    registry
        .register::<Arc<dyn ApplicationAccess>>(access)
        .expect("Failed to register application access");

    let provider: Arc<dyn ConfigurationProvider> = Arc::new(TomlConfigProvider::new(
        config_file.unwrap_or_else(default_config_file),
    ));
    registry
        .register::<Arc<dyn ConfigurationProvider>>(provider)
        .expect("Failed to register configuration provider");

    let sink: Arc<dyn TelemetrySink> = Arc::new(LogTelemetrySink);
    registry
        .register::<Arc<dyn TelemetrySink>>(sink)
        .expect("Failed to register telemetry sink");

    let runtime = ApplicationRuntime::new(
        Arc::new(HeartbeatLogic::new()),
        RuntimeConfig::default(),
        registry,
    )?;

    Ok(DaemonController::new(daemon_config, Arc::new(runtime)))
}

fn run_args(vars: Vec<(String, String)>, args: Vec<String>) -> RunArgs {
    let mut run_args = RunArgs::from_positional(args);
    for (key, value) in vars {
        run_args = run_args.with_named(key, value);
    }
    run_args
}

/// Start the daemon; exits with the application's exit code.
fn daemon_start(
    daemon_config: DaemonConfig,
    config_file: Option<PathBuf>,
    vars: Vec<(String, String)>,
    args: Vec<String>,
) -> i32 {
    let controller = match build_controller(daemon_config, config_file) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to initialize application runtime: {}", e);
            return ExitCode::GenericFailure.code();
        }
    };

    match controller.start(&run_args(vars, args)) {
        Ok(code) => code.code(),
        Err(e) => {
            error!("Failed to start daemon: {}", e);
            ExitCode::GenericFailure.code()
        }
    }
}

/// Stop the daemon.
fn daemon_stop(daemon_config: DaemonConfig) -> i32 {
    let controller = match build_controller(daemon_config, None) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to initialize application runtime: {}", e);
            return ExitCode::GenericFailure.code();
        }
    };

    match controller.stop() {
        Ok(()) => 0,
        Err(e) => {
            error!("Failed to stop daemon: {}", e);
            ExitCode::GenericFailure.code()
        }
    }
}

/// Restart the daemon; exits with the application's exit code.
fn daemon_restart(
    daemon_config: DaemonConfig,
    config_file: Option<PathBuf>,
    vars: Vec<(String, String)>,
    args: Vec<String>,
) -> i32 {
    let controller = match build_controller(daemon_config, config_file) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to initialize application runtime: {}", e);
            return ExitCode::GenericFailure.code();
        }
    };

    match controller.restart(&run_args(vars, args)) {
        Ok(code) => code.code(),
        Err(e) => {
            error!("Failed to restart daemon: {}", e);
            ExitCode::GenericFailure.code()
        }
    }
}

/// Report daemon status.
fn daemon_status(daemon_config: DaemonConfig, live: bool) -> i32 {
    let controller = match build_controller(daemon_config, None) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to initialize application runtime: {}", e);
            return ExitCode::GenericFailure.code();
        }
    };

    println!("PID file: {}", controller.config().pid_file().display());
    println!("Status: {}", controller.status());
    if live {
        let liveness = if controller.is_running() {
            "process is alive"
        } else {
            "no such process"
        };
        println!("Live: {}", liveness);
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_combines_positional_and_named() {
        let args = run_args(
            vec![("interval".to_string(), "5".to_string())],
            vec!["alpha".to_string()],
        );
        assert_eq!(args.positional, vec!["alpha".to_string()]);
        assert_eq!(args.named.get("interval").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_build_controller_succeeds() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = DaemonConfig::new(dir.path().join("keeld.pid"));
        let controller = build_controller(config, None).unwrap();
        assert_eq!(controller.status(), "not running");
    }
}
