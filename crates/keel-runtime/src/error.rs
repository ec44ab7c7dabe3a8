//! Error types for the runtime crate.

use keel_core::BoxError;
use thiserror::Error;

/// Errors raised while constructing an application runtime.
///
/// Construction fails fast: the first failure aborts it and no partial
/// runtime is ever produced.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A required configuration precondition failed; names the first
    /// failure.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// The business logic failed to bring up its services.
    #[error("Service initialization failed: {source}")]
    ServiceInitialization { source: BoxError },

    /// No application-access service is registered; the runtime would be
    /// unreachable by the rest of the system.
    #[error("No application access service is registered")]
    RegistryUnavailable,
}
