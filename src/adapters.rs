//! Demo collaborator implementations and path helpers for keeld.

use std::path::PathBuf;

use tracing::{error, info, warn};

use keel_core::{BoxError, ConfigurationProvider, TelemetrySink};

/// Get the .keel directory path.
pub(crate) fn keel_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".keel"))
        .unwrap_or_else(|| PathBuf::from(".keel"))
}

/// Default configuration file path.
pub(crate) fn default_config_file() -> PathBuf {
    keel_dir().join("keeld.toml")
}

/// Configuration provider backed by a TOML file.
///
/// A missing file is tolerated; the daemon runs on defaults. A present but
/// unparseable file is an error for the runtime to log.
pub(crate) struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ConfigurationProvider for TomlConfigProvider {
    fn load(&self) -> Result<(), BoxError> {
        if !self.path.exists() {
            warn!(
                "Configuration file {} not found, using defaults",
                self.path.display()
            );
            return Ok(());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let table: toml::Table = raw.parse()?;
        info!(
            "Loaded configuration from {} ({} top-level keys)",
            self.path.display(),
            table.len()
        );
        Ok(())
    }
}

/// Telemetry sink that reports exceptions through the log stream.
pub(crate) struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn report_exception(&self, error: &(dyn std::error::Error + 'static)) {
        error!("Reported exception to telemetry: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn test_missing_config_file_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("absent.toml"));
        assert!(provider.load().is_ok());
    }

    #[test]
    fn test_valid_config_file_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keeld.toml");
        std::fs::write(&path, "[daemon]\ndetach = false\n").unwrap();

        let provider = TomlConfigProvider::new(path);
        assert!(provider.load().is_ok());
    }

    #[test]
    fn test_malformed_config_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keeld.toml");
        std::fs::write(&path, "not [valid toml").unwrap();

        let provider = TomlConfigProvider::new(path);
        assert!(provider.load().is_err());
    }

    #[test]
    fn test_default_config_file_location() {
        assert!(default_config_file().ends_with("keeld.toml"));
    }
}
