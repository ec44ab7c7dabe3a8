//! Daemon lifecycle controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use keel_core::ExitCode;
use keel_runtime::{ApplicationRuntime, RunArgs};

use crate::config::DaemonConfig;
use crate::detach::{DetachOutcome, detach_from_terminal};
use crate::error::DaemonError;
use crate::lock::{ProcessLock, install_exit_cleanup};
use crate::signal::{
    Delivery, OsSignalSender, SignalSender, SignalTable, install_signal_handlers, process_alive,
};

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

/// Interval between TERM deliveries while stopping.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Every this many stop iterations, a HUP is sent after the TERM.
const ESCALATION_PERIOD: u32 = 10;

/// Controller state as an atomic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControllerState {
    Stopped = 0,
    Forking = 1,
    Running = 2,
}

impl From<u8> for ControllerState {
    fn from(v: u8) -> Self {
        match v {
            0 => ControllerState::Stopped,
            1 => ControllerState::Forking,
            2 => ControllerState::Running,
            _ => ControllerState::Stopped,
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Stopped => write!(f, "stopped"),
            ControllerState::Forking => write!(f, "forking"),
            ControllerState::Running => write!(f, "running"),
        }
    }
}

/// Drives a hosted [`ApplicationRuntime`] as a Unix daemon.
///
/// The controller owns the PID-file lock, the detachment step, and signal
/// installation; the runtime stays unaware of all three. `start` runs the
/// application in this process; `stop`, `status`, and `is_running` act on
/// whatever process the PID file currently records.
pub struct DaemonController {
    config: DaemonConfig,
    runtime: Arc<ApplicationRuntime>,
    lock: ProcessLock,
    state: AtomicU8,
    alive: Arc<AtomicBool>,
    sender: Box<dyn SignalSender>,
}

impl DaemonController {
    /// Create a controller for the given daemon config and runtime.
    pub fn new(config: DaemonConfig, runtime: Arc<ApplicationRuntime>) -> Self {
        let lock = ProcessLock::new(config.pid_file());
        Self {
            config,
            runtime,
            lock,
            state: AtomicU8::new(ControllerState::Stopped as u8),
            alive: Arc::new(AtomicBool::new(false)),
            sender: Box::new(OsSignalSender),
        }
    }

    /// Replace the signal sender, so tests can observe the stop cadence.
    #[cfg(test)]
    pub(crate) fn with_signal_sender(mut self, sender: Box<dyn SignalSender>) -> Self {
        self.sender = sender;
        self
    }

    /// Get the current controller state.
    pub fn state(&self) -> ControllerState {
        ControllerState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Start the daemon and run the hosted application to completion.
    ///
    /// Refuses while the PID file holds a readable PID, with no liveness
    /// probe: a stale lock blocks `start` until removed. Returns the
    /// application's exit code once it terminates.
    pub fn start(&self, args: &RunArgs) -> Result<ExitCode, DaemonError> {
        let current = self.state.load(Ordering::SeqCst);
        if current != ControllerState::Stopped as u8 {
            return Err(DaemonError::InvalidStateTransition {
                from: ControllerState::from(current),
                to: ControllerState::Forking,
            });
        }

        if let Some(pid) = self.lock.read() {
            return Err(DaemonError::AlreadyRunning {
                path: self.lock.path().to_path_buf(),
                pid,
            });
        }

        self.state
            .store(ControllerState::Forking as u8, Ordering::SeqCst);
        info!("Daemon starting...");

        if self.config.detach() {
            match detach_from_terminal(&self.config)? {
                DetachOutcome::Detached => {}
                DetachOutcome::Unsupported => {
                    warn!("Continuing in the foreground");
                }
            }
        }

        // From here on we are the final process. Handlers and cleanup must
        // be in place before the lock names our PID.
        self.alive.store(true, Ordering::SeqCst);
        let table = SignalTable::new(self.runtime.logic(), self.runtime.id(), self.alive.clone());
        install_signal_handlers(Arc::new(table))?;
        install_exit_cleanup(&self.lock);
        self.lock.write(std::process::id())?;

        self.state
            .store(ControllerState::Running as u8, Ordering::SeqCst);
        info!("Daemon started (PID: {})", std::process::id());

        let code = self.runtime.run(args);

        self.alive.store(false, Ordering::SeqCst);
        self.state
            .store(ControllerState::Stopped as u8, Ordering::SeqCst);
        info!("Daemon finished with exit code {}", code.code());
        Ok(code)
    }

    /// Stop the daemon recorded in the PID file, blocking until it exits.
    ///
    /// Sends TERM every 100 ms, with a HUP after every tenth TERM, until
    /// delivery reports the process gone. There is no overall timeout: an
    /// unkillable target keeps `stop` waiting rather than reporting a
    /// success that did not happen.
    pub fn stop(&self) -> Result<(), DaemonError> {
        let Some(pid) = self.lock.read() else {
            // Ownership-gated, so usually a no-op here.
            self.lock.clear()?;
            return Err(DaemonError::NotRunning {
                path: self.lock.path().to_path_buf(),
            });
        };

        info!("Stopping daemon with PID {}", pid);

        let mut iterations: u32 = 0;
        loop {
            if self.sender.send_term(pid)? == Delivery::NoSuchProcess {
                break;
            }
            std::thread::sleep(STOP_POLL_INTERVAL);
            iterations += 1;
            if iterations % ESCALATION_PERIOD == 0 {
                warn!("Daemon with PID {} still running, sending SIGHUP", pid);
                if self.sender.send_hup(pid)? == Delivery::NoSuchProcess {
                    break;
                }
            }
        }

        // The daemon's own exit cleanup normally removed the file already;
        // a foreign-owned leftover is left untouched.
        self.lock.clear()?;
        info!("Daemon stopped");
        Ok(())
    }

    /// Stop the recorded daemon, then start again in this process.
    ///
    /// Restarting a daemon that is not running fails with `NotRunning`.
    pub fn restart(&self, args: &RunArgs) -> Result<ExitCode, DaemonError> {
        self.stop()?;
        self.start(args)
    }

    /// Advisory status derived from lock presence alone.
    pub fn status(&self) -> String {
        match self.lock.read() {
            Some(pid) => format!("running with PID {}", pid),
            None => "not running".to_string(),
        }
    }

    /// Whether the recorded process currently exists (signal-0 probe).
    ///
    /// Unlike `start` and `status`, this checks the OS, so it reports false
    /// for a stale lock that would still refuse a `start`.
    pub fn is_running(&self) -> bool {
        match self.lock.read() {
            Some(pid) => process_alive(pid),
            None => false,
        }
    }
}
