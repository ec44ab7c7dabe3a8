//! # Keel Runtime
//!
//! The application shell of the Keel framework: configuration preconditions,
//! service initialization, and a single failure-interception boundary around
//! the business-logic hooks.
//!
//! ## Components
//!
//! - [`BusinessLogic`] - The hook trait an embedding application implements;
//!   every hook has a safe default
//! - [`RuntimeConfig`] - Constructor-time configuration with `*_required`
//!   precondition validation
//! - [`ApplicationRuntime`] - The state machine driving construct → run →
//!   terminate

pub mod config;
pub mod error;
pub mod hooks;
pub mod runtime;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use hooks::{BusinessLogic, RunArgs, SignalContext};
pub use runtime::{ApplicationRuntime, RuntimeState};
