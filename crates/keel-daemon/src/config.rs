//! Daemon process configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use keel_core::paths;

/// Null device path used when no stream target is configured.
#[cfg(unix)]
pub const NULL_DEVICE: &str = "/dev/null";
#[cfg(not(unix))]
pub const NULL_DEVICE: &str = "NUL";

/// Process-level daemon configuration.
///
/// Covers the PID file, terminal detachment, and stream targets. The hosted
/// application keeps its own `RuntimeConfig`; the two are composed by the
/// controller, never merged.
///
/// Paths are tilde-expanded and resolved to absolute form at construction
/// time and are immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawDaemonConfig")]
pub struct DaemonConfig {
    pid_file: PathBuf,
    working_directory: PathBuf,
    stdin_file: Option<PathBuf>,
    stdout_file: Option<PathBuf>,
    stderr_file: Option<PathBuf>,
    file_creation_mask: u32,
    detach: bool,
}

/// Wire shape with per-field defaults; normalized into [`DaemonConfig`].
#[derive(Debug, Deserialize)]
struct RawDaemonConfig {
    #[serde(default = "default_pid_file")]
    pid_file: PathBuf,

    #[serde(default = "default_working_directory")]
    working_directory: PathBuf,

    #[serde(default)]
    stdin_file: Option<PathBuf>,

    #[serde(default)]
    stdout_file: Option<PathBuf>,

    #[serde(default)]
    stderr_file: Option<PathBuf>,

    #[serde(default = "default_file_creation_mask")]
    file_creation_mask: u32,

    #[serde(default = "default_detach")]
    detach: bool,
}

fn default_pid_file() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".keel").join("keeld.pid"))
        .unwrap_or_else(|| PathBuf::from("/tmp/keeld.pid"))
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_creation_mask() -> u32 {
    0o022
}

fn default_detach() -> bool {
    true
}

impl From<RawDaemonConfig> for DaemonConfig {
    fn from(raw: RawDaemonConfig) -> Self {
        Self {
            pid_file: paths::absolutize(&raw.pid_file),
            working_directory: paths::absolutize(&raw.working_directory),
            stdin_file: raw.stdin_file,
            stdout_file: raw.stdout_file,
            stderr_file: raw.stderr_file,
            file_creation_mask: raw.file_creation_mask,
            detach: raw.detach,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::new(default_pid_file())
    }
}

impl DaemonConfig {
    /// Create a config for the given PID file path with all other fields at
    /// their defaults.
    pub fn new(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: paths::absolutize(&pid_file.into()),
            working_directory: paths::absolutize(&default_working_directory()),
            stdin_file: None,
            stdout_file: None,
            stderr_file: None,
            file_creation_mask: default_file_creation_mask(),
            detach: default_detach(),
        }
    }

    /// Set the working directory the daemon changes into after detaching.
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = paths::absolutize(&dir.into());
        self
    }

    /// Rebind stdin to the given file instead of the null device.
    pub fn with_stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// Rebind stdout to the given file instead of the null device.
    pub fn with_stdout_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(path.into());
        self
    }

    /// Rebind stderr to the given file instead of the null device.
    pub fn with_stderr_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr_file = Some(path.into());
        self
    }

    /// Set the file-creation mask applied after detaching.
    pub fn with_file_creation_mask(mut self, mask: u32) -> Self {
        self.file_creation_mask = mask;
        self
    }

    /// Enable or disable terminal detachment. With detachment off, the
    /// process stays in the foreground while the lock, signal handlers, and
    /// exit cleanup still apply.
    pub fn with_detach(mut self, detach: bool) -> Self {
        self.detach = detach;
        self
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn file_creation_mask(&self) -> u32 {
        self.file_creation_mask
    }

    pub fn detach(&self) -> bool {
        self.detach
    }

    /// Stdin target, defaulting to the null device.
    pub fn stdin_path(&self) -> &Path {
        self.stdin_file.as_deref().unwrap_or(Path::new(NULL_DEVICE))
    }

    /// Stdout target, defaulting to the null device.
    pub fn stdout_path(&self) -> &Path {
        self.stdout_file
            .as_deref()
            .unwrap_or(Path::new(NULL_DEVICE))
    }

    /// Stderr target, defaulting to the null device.
    pub fn stderr_path(&self) -> &Path {
        self.stderr_file
            .as_deref()
            .unwrap_or(Path::new(NULL_DEVICE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert!(config.detach());
        assert_eq!(config.file_creation_mask(), 0o022);
        assert!(config.pid_file().is_absolute());
        assert!(config.pid_file().ends_with("keeld.pid"));
        assert!(config.working_directory().is_absolute());
    }

    #[test]
    fn test_new_absolutizes_pid_file() {
        let config = DaemonConfig::new("relative.pid");
        assert!(config.pid_file().is_absolute());
        assert!(config.pid_file().ends_with("relative.pid"));
    }

    #[test]
    fn test_new_expands_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = DaemonConfig::new("~/keel-test.pid");
        assert_eq!(config.pid_file(), home.join("keel-test.pid"));
    }

    #[test]
    fn test_builders() {
        let config = DaemonConfig::new("/tmp/keel-test.pid")
            .with_working_directory("/tmp")
            .with_stdout_file("/tmp/out.log")
            .with_stderr_file("/tmp/err.log")
            .with_file_creation_mask(0o027)
            .with_detach(false);

        assert_eq!(config.working_directory(), Path::new("/tmp"));
        assert_eq!(config.stdout_path(), Path::new("/tmp/out.log"));
        assert_eq!(config.stderr_path(), Path::new("/tmp/err.log"));
        assert_eq!(config.file_creation_mask(), 0o027);
        assert!(!config.detach());
    }

    #[test]
    fn test_stream_paths_default_to_null_device() {
        let config = DaemonConfig::new("/tmp/keel-test.pid");
        assert_eq!(config.stdin_path(), Path::new(NULL_DEVICE));
        assert_eq!(config.stdout_path(), Path::new(NULL_DEVICE));
        assert_eq!(config.stderr_path(), Path::new(NULL_DEVICE));
    }

    #[test]
    fn test_deserialization_applies_defaults() {
        let json = r#"{"pid_file": "/tmp/keel-test.pid", "detach": false}"#;
        let config: DaemonConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.pid_file(), Path::new("/tmp/keel-test.pid"));
        assert!(!config.detach());
        assert_eq!(config.file_creation_mask(), 0o022);
        assert_eq!(config.stdin_path(), Path::new(NULL_DEVICE));
    }

    #[test]
    fn test_deserialization_normalizes_paths() {
        let json = r#"{"pid_file": "deserialized.pid"}"#;
        let config: DaemonConfig = serde_json::from_str(json).unwrap();
        assert!(config.pid_file().is_absolute());
    }

    #[test]
    fn test_serialization() {
        let config = DaemonConfig::new("/tmp/keel-test.pid");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("pid_file"));
        assert!(json.contains("detach"));
    }
}
