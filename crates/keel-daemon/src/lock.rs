//! PID-file process lock.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::DaemonError;

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

/// PID-file lock preventing duplicate daemon instances.
///
/// The file holds the owning PID in decimal followed by a newline. The lock
/// is advisory: there is no OS-level file locking, single-writer discipline
/// comes from the daemon lifecycle itself.
#[derive(Debug, Clone)]
pub struct ProcessLock {
    path: PathBuf,
}

impl ProcessLock {
    /// Create a lock handle for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the lock file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the PID recorded in the lock file.
    ///
    /// A missing, unreadable, or unparsable file reads as `None`; corruption
    /// is indistinguishable from absence.
    pub fn read(&self) -> Option<u32> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) => {
                if error.kind() != ErrorKind::NotFound {
                    debug!("Unreadable PID file {}: {}", self.path.display(), error);
                }
                return None;
            }
        };

        match contents.trim().parse::<u32>() {
            Ok(pid) => Some(pid),
            Err(_) => {
                warn!(
                    "Ignoring corrupt PID file {}: {:?}",
                    self.path.display(),
                    contents.trim()
                );
                None
            }
        }
    }

    /// Write a PID to the lock file, creating parent directories as needed.
    pub fn write(&self, pid: u32) -> Result<(), DaemonError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DaemonError::LockWrite {
                path: self.path.clone(),
                reason: format!("Failed to create parent directory: {}", e),
            })?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| DaemonError::LockWrite {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        writeln!(file, "{}", pid).map_err(|e| DaemonError::LockWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        info!("PID file created: {} (PID: {})", self.path.display(), pid);
        Ok(())
    }

    /// Remove the lock file if and only if it records the calling process's
    /// own PID.
    ///
    /// Anything else (foreign PID, corruption, absence) is a silent no-op;
    /// another process's lock is never touched. Only a failing delete of an
    /// owned file is loud.
    pub fn clear(&self) -> Result<(), DaemonError> {
        match self.read() {
            Some(pid) if pid == std::process::id() => {}
            _ => return Ok(()),
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("PID file removed: {}", self.path.display());
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(DaemonError::LockClear {
                path: self.path.clone(),
                reason: error.to_string(),
            }),
        }
    }
}

#[cfg(unix)]
static EXIT_CLEANUP: std::sync::Mutex<Option<ProcessLock>> = std::sync::Mutex::new(None);

#[cfg(unix)]
static EXIT_HOOK: std::sync::Once = std::sync::Once::new();

#[cfg(unix)]
extern "C" fn clear_lock_at_exit() {
    if let Ok(guard) = EXIT_CLEANUP.lock() {
        if let Some(lock) = guard.as_ref() {
            let _ = lock.clear();
        }
    }
}

/// Register a process-exit cleanup that clears the lock.
///
/// Runs on normal exit paths including `std::process::exit`, which skips
/// `Drop`. The cleanup goes through [`ProcessLock::clear`], so it only ever
/// removes a file owned by the exiting process.
pub fn install_exit_cleanup(lock: &ProcessLock) {
    #[cfg(unix)]
    {
        if let Ok(mut guard) = EXIT_CLEANUP.lock() {
            *guard = Some(lock.clone());
        }
        EXIT_HOOK.call_once(|| {
            let rc = unsafe { libc::atexit(clear_lock_at_exit) };
            if rc != 0 {
                warn!(
                    "Failed to register exit cleanup for {}",
                    lock.path().display()
                );
            }
        });
    }
    #[cfg(not(unix))]
    {
        debug!(
            "Exit cleanup not supported on this platform ({})",
            lock.path().display()
        );
    }
}
