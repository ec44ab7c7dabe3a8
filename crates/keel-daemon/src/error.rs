//! Daemon-related errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::controller::ControllerState;

/// Errors that can occur during daemon lifecycle control.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// PID file already exists; another instance owns the lock.
    #[error("Daemon already running (PID file: {path}, PID: {pid})")]
    AlreadyRunning { path: PathBuf, pid: u32 },

    /// No readable PID file; there is nothing to stop.
    #[error("Daemon is not running (PID file: {path})")]
    NotRunning { path: PathBuf },

    /// Process fork failed.
    #[error("Failed to fork process: {0}")]
    ForkFailed(String),

    /// Session or stdio detachment failed after forking.
    #[error("Failed to detach from terminal: {0}")]
    Detach(String),

    /// Failed to set up signal handlers.
    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// Failed to deliver a signal to another process.
    #[error("Failed to signal PID {pid}: {reason}")]
    SignalDelivery { pid: u32, reason: String },

    /// Failed to write the PID file.
    #[error("Failed to write PID file at {path}: {reason}")]
    LockWrite { path: PathBuf, reason: String },

    /// Failed to remove the PID file.
    #[error("Failed to remove PID file at {path}: {reason}")]
    LockClear { path: PathBuf, reason: String },

    /// Operation not legal from the current controller state.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: ControllerState,
        to: ControllerState,
    },
}
