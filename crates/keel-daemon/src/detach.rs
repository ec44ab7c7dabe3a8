//! Terminal detachment for Unix daemons.
//!
//! Classic double fork, kept separate from the controller state machine so
//! the controller stays testable in-process.

use crate::config::DaemonConfig;
use crate::error::DaemonError;

/// Result of a detachment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    /// Running as the detached grandchild with streams rebound.
    Detached,
    /// Platform has no fork; the caller continues in the foreground.
    Unsupported,
}

/// Detach the current process from its controlling terminal.
///
/// The original parent and the intermediate child both exit with code 0, so
/// only the fully detached grandchild returns from this function. Must be
/// called before any threads exist; fork carries only the calling thread.
#[cfg(unix)]
pub fn detach_from_terminal(config: &DaemonConfig) -> Result<DetachOutcome, DaemonError> {
    use std::io::Write;
    use std::os::unix::io::AsRawFd;

    use nix::sys::stat::{Mode, umask};
    use nix::unistd::{ForkResult, chdir, dup2, fork, setsid};
    use tracing::info;

    // First fork: the original parent returns to the shell.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {
            std::process::exit(0);
        }
        Ok(ForkResult::Child) => {}
        Err(e) => return Err(DaemonError::ForkFailed(e.to_string())),
    }

    setsid().map_err(|e| DaemonError::Detach(format!("setsid failed: {}", e)))?;

    chdir(config.working_directory())
        .map_err(|e| DaemonError::Detach(format!("chdir failed: {}", e)))?;

    umask(Mode::from_bits_truncate(
        config.file_creation_mask() as libc::mode_t
    ));

    // Second fork: a session leader could reacquire a terminal, the
    // grandchild cannot.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { .. }) => {
            std::process::exit(0);
        }
        Ok(ForkResult::Child) => {}
        Err(e) => return Err(DaemonError::ForkFailed(e.to_string())),
    }

    // Anything still buffered belongs to the pre-detach console.
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    let stdin = std::fs::File::open(config.stdin_path())
        .map_err(|e| DaemonError::Detach(format!("Failed to open stdin target: {}", e)))?;
    let stdout = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(config.stdout_path())
        .map_err(|e| DaemonError::Detach(format!("Failed to open stdout target: {}", e)))?;
    let stderr = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(config.stderr_path())
        .map_err(|e| DaemonError::Detach(format!("Failed to open stderr target: {}", e)))?;

    dup2(stdin.as_raw_fd(), 0)
        .map_err(|e| DaemonError::Detach(format!("dup2 stdin failed: {}", e)))?;
    dup2(stdout.as_raw_fd(), 1)
        .map_err(|e| DaemonError::Detach(format!("dup2 stdout failed: {}", e)))?;
    dup2(stderr.as_raw_fd(), 2)
        .map_err(|e| DaemonError::Detach(format!("dup2 stderr failed: {}", e)))?;

    info!("Process detached from terminal (PID: {})", std::process::id());
    Ok(DetachOutcome::Detached)
}

/// Non-Unix fallback: detachment degrades to foreground execution.
#[cfg(not(unix))]
pub fn detach_from_terminal(_config: &DaemonConfig) -> Result<DetachOutcome, DaemonError> {
    tracing::warn!("Terminal detachment not supported on this platform, continuing in foreground");
    Ok(DetachOutcome::Unsupported)
}
