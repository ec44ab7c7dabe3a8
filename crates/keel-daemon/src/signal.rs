//! Signal dispatch for daemon processes.
//!
//! The dispatch table is plain code with no OS coupling; only
//! [`install_signal_handlers`] and the delivery helpers talk to the kernel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};
use uuid::Uuid;

use keel_runtime::{BusinessLogic, SignalContext};

use crate::error::DaemonError;

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;

/// Signals the daemon consumes, each forwarded to a business-logic hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonSignal {
    /// Graceful shutdown request (SIGTERM).
    Terminate,
    /// Interactive interrupt (SIGINT).
    Interrupt,
    /// Timer expiry (SIGALRM).
    Alarm,
    /// Application-defined (SIGUSR1).
    User1,
    /// Application-defined (SIGUSR2).
    User2,
}

impl DaemonSignal {
    /// All signals the daemon consumes. SIGHUP is deliberately absent: the
    /// stop loop sends it as an escalation nudge, nothing consumes it.
    pub const ALL: [DaemonSignal; 5] = [
        DaemonSignal::Terminate,
        DaemonSignal::Interrupt,
        DaemonSignal::Alarm,
        DaemonSignal::User1,
        DaemonSignal::User2,
    ];

    /// Raw OS signal number.
    #[cfg(unix)]
    pub fn raw(self) -> i32 {
        match self {
            DaemonSignal::Terminate => libc::SIGTERM,
            DaemonSignal::Interrupt => libc::SIGINT,
            DaemonSignal::Alarm => libc::SIGALRM,
            DaemonSignal::User1 => libc::SIGUSR1,
            DaemonSignal::User2 => libc::SIGUSR2,
        }
    }

    /// Conventional signal-number stand-ins for platforms without them.
    #[cfg(not(unix))]
    pub fn raw(self) -> i32 {
        match self {
            DaemonSignal::Terminate => 15,
            DaemonSignal::Interrupt => 2,
            DaemonSignal::Alarm => 14,
            DaemonSignal::User1 => 10,
            DaemonSignal::User2 => 12,
        }
    }

    /// Map a raw signal number back to a consumed signal.
    pub fn try_from_raw(signo: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|signal| signal.raw() == signo)
    }
}

impl std::fmt::Display for DaemonSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonSignal::Terminate => write!(f, "SIGTERM"),
            DaemonSignal::Interrupt => write!(f, "SIGINT"),
            DaemonSignal::Alarm => write!(f, "SIGALRM"),
            DaemonSignal::User1 => write!(f, "SIGUSR1"),
            DaemonSignal::User2 => write!(f, "SIGUSR2"),
        }
    }
}

/// What the OS adapter should do after a signal was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDisposition {
    /// Keep running.
    Continue,
    /// Terminate the process with exit code 0.
    Exit,
}

/// Controller-owned signal dispatch table.
///
/// Maps each consumed signal to its business-logic hook. Shutdown signals
/// additionally clear the shared alive flag and report
/// [`SignalDisposition::Exit`]; acting on that (exiting the process) is the
/// OS adapter's job, which keeps the table itself testable.
pub struct SignalTable {
    logic: Arc<dyn BusinessLogic>,
    runtime_id: Uuid,
    alive: Arc<AtomicBool>,
}

impl SignalTable {
    pub fn new(logic: Arc<dyn BusinessLogic>, runtime_id: Uuid, alive: Arc<AtomicBool>) -> Self {
        Self {
            logic,
            runtime_id,
            alive,
        }
    }

    /// Forward a signal to its hook and report the disposition.
    pub fn dispatch(&self, signal: DaemonSignal) -> SignalDisposition {
        let ctx = SignalContext::new(self.runtime_id, signal.raw());
        debug!("Dispatching {} to business logic", signal);

        match signal {
            DaemonSignal::Terminate => {
                self.logic.on_sigterm(ctx);
                self.alive.store(false, Ordering::SeqCst);
                SignalDisposition::Exit
            }
            DaemonSignal::Interrupt => {
                self.logic.on_sigint(ctx);
                self.alive.store(false, Ordering::SeqCst);
                SignalDisposition::Exit
            }
            DaemonSignal::Alarm => {
                self.logic.on_sigalrm(ctx);
                SignalDisposition::Continue
            }
            DaemonSignal::User1 => {
                self.logic.on_sigusr1(ctx);
                SignalDisposition::Continue
            }
            DaemonSignal::User2 => {
                self.logic.on_sigusr2(ctx);
                SignalDisposition::Continue
            }
        }
    }
}

/// Install OS handlers for all consumed signals, serviced on a dedicated
/// dispatcher thread (Unix only).
#[cfg(unix)]
pub fn install_signal_handlers(table: Arc<SignalTable>) -> Result<(), DaemonError> {
    use signal_hook::iterator::Signals;

    let raw: Vec<i32> = DaemonSignal::ALL.iter().map(|s| s.raw()).collect();
    let mut signals = Signals::new(&raw).map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

    std::thread::Builder::new()
        .name("keel-signal-dispatch".to_string())
        .spawn(move || {
            for signo in signals.forever() {
                let Some(signal) = DaemonSignal::try_from_raw(signo) else {
                    continue;
                };
                info!("Received {}", signal);
                if table.dispatch(signal) == SignalDisposition::Exit {
                    // exit(0) still runs the registered atexit cleanups.
                    std::process::exit(0);
                }
            }
        })
        .map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

    info!("OS signal handlers installed (SIGTERM, SIGINT, SIGALRM, SIGUSR1, SIGUSR2)");
    Ok(())
}

/// Non-Unix fallback: no handlers to install.
#[cfg(not(unix))]
pub fn install_signal_handlers(_table: Arc<SignalTable>) -> Result<(), DaemonError> {
    info!("OS signal dispatch not supported on this platform");
    Ok(())
}

/// Outcome of delivering a signal to another process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The signal was queued for the target process.
    Delivered,
    /// The target process does not exist (ESRCH).
    NoSuchProcess,
}

/// Delivers control signals to another process.
///
/// The controller's stop loop goes through this seam, so tests can observe
/// the send cadence without killing anything.
pub trait SignalSender: Send + Sync {
    fn send_term(&self, pid: u32) -> Result<Delivery, DaemonError>;
    fn send_hup(&self, pid: u32) -> Result<Delivery, DaemonError>;
}

/// Production sender backed by `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignalSender;

#[cfg(unix)]
impl SignalSender for OsSignalSender {
    fn send_term(&self, pid: u32) -> Result<Delivery, DaemonError> {
        deliver(pid, nix::sys::signal::Signal::SIGTERM)
    }

    fn send_hup(&self, pid: u32) -> Result<Delivery, DaemonError> {
        deliver(pid, nix::sys::signal::Signal::SIGHUP)
    }
}

#[cfg(not(unix))]
impl SignalSender for OsSignalSender {
    fn send_term(&self, pid: u32) -> Result<Delivery, DaemonError> {
        Err(unsupported(pid))
    }

    fn send_hup(&self, pid: u32) -> Result<Delivery, DaemonError> {
        Err(unsupported(pid))
    }
}

#[cfg(unix)]
fn deliver(pid: u32, signal: nix::sys::signal::Signal) -> Result<Delivery, DaemonError> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) => {
            debug!("Sent {} to PID {}", signal.as_str(), pid);
            Ok(Delivery::Delivered)
        }
        Err(Errno::ESRCH) => Ok(Delivery::NoSuchProcess),
        Err(errno) => Err(DaemonError::SignalDelivery {
            pid,
            reason: errno.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn unsupported(pid: u32) -> DaemonError {
    DaemonError::SignalDelivery {
        pid,
        reason: "Signal delivery not supported on this platform".to_string(),
    }
}

/// Check whether a process with the given PID exists.
///
/// Signal-0 probe; EPERM still means the process exists, only ESRCH reports
/// it gone.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Non-Unix fallback: without a probe, assume the process is running.
#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    true
}
