//! Runtime configuration and precondition validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use keel_core::paths;

use crate::error::RuntimeError;

/// Constructor-time application configuration.
///
/// Every field is optional on its own; requirements are expressed through
/// the paired `*_required` flags and checked by [`RuntimeConfig::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory the application's services live under.
    #[serde(default)]
    pub service_directory: Option<PathBuf>,

    /// Logical package under the service directory.
    #[serde(default)]
    pub service_package: Option<String>,

    /// Directory configuration files are read from.
    #[serde(default)]
    pub config_directory: Option<PathBuf>,

    /// Directory the application may write runtime data to.
    #[serde(default)]
    pub data_directory: Option<PathBuf>,

    /// Require the service directory and package to resolve.
    #[serde(default)]
    pub service_directory_required: bool,

    /// Require the config directory to resolve.
    #[serde(default)]
    pub config_directory_required: bool,

    /// Require the data directory to resolve.
    #[serde(default)]
    pub data_directory_required: bool,

    /// Run with verbose diagnostics.
    #[serde(default)]
    pub debug_mode: bool,

    /// Where telemetry reports should go. Advisory: the registered sink
    /// service is the actual integration point.
    #[serde(default)]
    pub telemetry_endpoint: Option<String>,
}

impl RuntimeConfig {
    /// Validate every `*_required` precondition, in declaration order,
    /// stopping at the first failure.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.service_directory_required {
            let dir =
                Self::existing_directory("service directory", self.service_directory.as_deref())?;
            let package = self
                .service_package
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| invalid("service package is required but not set"))?;
            if !dir.join(package).exists() {
                return Err(invalid(format!(
                    "service package {} does not exist under {}",
                    package,
                    dir.display()
                )));
            }
        }

        if self.config_directory_required {
            Self::existing_directory("config directory", self.config_directory.as_deref())?;
        }

        if self.data_directory_required {
            Self::existing_directory("data directory", self.data_directory.as_deref())?;
        }

        Ok(())
    }

    fn existing_directory(name: &str, path: Option<&Path>) -> Result<PathBuf, RuntimeError> {
        let path = path
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| invalid(format!("{} is required but not set", name)))?;
        let resolved = paths::absolutize(path);
        if !resolved.is_dir() {
            return Err(invalid(format!(
                "{} {} is not a directory",
                name,
                resolved.display()
            )));
        }
        Ok(resolved)
    }
}

fn invalid(reason: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidConfiguration {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_validates() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_required_data_directory() {
        let config = RuntimeConfig {
            data_directory_required: true,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("data directory"));
    }

    #[test]
    fn test_nonexistent_required_config_directory() {
        let config = RuntimeConfig {
            config_directory: Some(PathBuf::from("/nonexistent/keel/config")),
            config_directory_required: true,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("config directory"));
    }

    #[test]
    fn test_existing_required_directories() {
        let dir = TempDir::new().unwrap();
        let config = RuntimeConfig {
            config_directory: Some(dir.path().to_path_buf()),
            config_directory_required: true,
            data_directory: Some(dir.path().to_path_buf()),
            data_directory_required: true,
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_service_package_must_resolve() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("billing")).unwrap();

        let mut config = RuntimeConfig {
            service_directory: Some(dir.path().to_path_buf()),
            service_package: Some("billing".to_string()),
            service_directory_required: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.service_package = Some("missing".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_first_failure_is_reported() {
        // Both service and data requirements fail; the earlier one names
        // the error.
        let config = RuntimeConfig {
            service_directory_required: true,
            data_directory_required: true,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service directory"));
    }

    #[test]
    fn test_empty_service_package_rejected() {
        let dir = TempDir::new().unwrap();
        let config = RuntimeConfig {
            service_directory: Some(dir.path().to_path_buf()),
            service_package: Some("   ".to_string()),
            service_directory_required: true,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service package"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.debug_mode);
        assert!(config.service_directory.is_none());
        assert!(!config.data_directory_required);
    }
}
