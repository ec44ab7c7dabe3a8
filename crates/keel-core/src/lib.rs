//! # Keel Core
//!
//! Shared foundation for the Keel daemon framework.
//!
//! ## Components
//!
//! - [`ServiceRegistry`] - Type-indexed registry for explicit dependency
//!   injection
//! - [`ExitCode`] - The closed exit-code contract daemons report to their
//!   supervisor
//! - Collaborator interfaces ([`ConfigurationProvider`], [`TelemetrySink`],
//!   [`ApplicationAccess`]) specified at their boundary; implementations live
//!   with the embedding application

pub mod error;
pub mod exit;
pub mod paths;
pub mod registry;
pub mod services;

pub use error::CoreError;
pub use exit::ExitCode;
pub use registry::ServiceRegistry;
pub use services::{
    ApplicationAccess, ApplicationInfo, BoxError, ConfigurationProvider, SharedApplicationAccess,
    TelemetrySink,
};
