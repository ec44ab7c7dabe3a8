//! Error types for the core crate.

use thiserror::Error;

/// Errors raised by the service registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Service already registered for type: {kind}")]
    AlreadyRegistered { kind: &'static str },
}
