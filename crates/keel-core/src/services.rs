//! Collaborator interfaces the framework consumes but does not implement.
//!
//! The runtime reaches these services through the
//! [`ServiceRegistry`](crate::ServiceRegistry); the embedding application
//! decides which implementations to register.

use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Boxed error used at open boundaries (hooks, collaborator interfaces).
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Loads or refreshes application configuration.
///
/// File formats, precedence, and validation are the provider's business; the
/// runtime only triggers a load at the top of its run sequence.
pub trait ConfigurationProvider: Send + Sync {
    fn load(&self) -> Result<(), BoxError>;
}

/// Receives the failure report produced when business logic fails.
pub trait TelemetrySink: Send + Sync {
    fn report_exception(&self, error: &(dyn Error + 'static));
}

/// Snapshot of a running application, published at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub runtime_id: Uuid,
    pub pid: u32,
    pub debug_mode: bool,
    pub service_directory: Option<PathBuf>,
    pub config_directory: Option<PathBuf>,
    pub data_directory: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

/// Application-handle registry: how the rest of the system reaches the
/// application that owns this process.
pub trait ApplicationAccess: Send + Sync {
    /// Publish the handle for the application that now owns this process.
    fn publish(&self, info: ApplicationInfo);

    /// The most recently published handle, if any.
    fn current(&self) -> Option<ApplicationInfo>;
}

/// In-process [`ApplicationAccess`] backed by a lock-protected slot.
#[derive(Default)]
pub struct SharedApplicationAccess {
    slot: RwLock<Option<ApplicationInfo>>,
}

impl SharedApplicationAccess {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplicationAccess for SharedApplicationAccess {
    fn publish(&self, info: ApplicationInfo) {
        *self.slot.write() = Some(info);
    }

    fn current(&self) -> Option<ApplicationInfo> {
        self.slot.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info(pid: u32) -> ApplicationInfo {
        ApplicationInfo {
            runtime_id: Uuid::new_v4(),
            pid,
            debug_mode: false,
            service_directory: None,
            config_directory: None,
            data_directory: None,
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_starts_empty() {
        let access = SharedApplicationAccess::new();
        assert!(access.current().is_none());
    }

    #[test]
    fn test_publish_and_current() {
        let access = SharedApplicationAccess::new();
        let info = sample_info(1234);

        access.publish(info.clone());
        assert_eq!(access.current(), Some(info));
    }

    #[test]
    fn test_publish_replaces_previous_handle() {
        let access = SharedApplicationAccess::new();
        access.publish(sample_info(1));
        access.publish(sample_info(2));

        assert_eq!(access.current().map(|info| info.pid), Some(2));
    }

    #[test]
    fn test_application_info_serialization() {
        let info = sample_info(1234);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("runtime_id"));
        assert!(json.contains("1234"));

        let parsed: ApplicationInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }
}
