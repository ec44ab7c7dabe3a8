//! # Keel Daemon
//!
//! Unix daemonization and process control for the Keel framework.
//!
//! ## Features
//!
//! - PID-file process lock (prevents duplicate instances, ownership-gated
//!   cleanup)
//! - Signal dispatch (TERM/INT for shutdown, ALRM/USR1/USR2 forwarded to
//!   business-logic hooks)
//! - Process daemonization (double fork, session and stdio detachment)
//! - start/stop/restart/status control surface over the PID file
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use keel_core::{ApplicationAccess, ServiceRegistry, SharedApplicationAccess};
//! use keel_daemon::{DaemonConfig, DaemonController};
//! use keel_runtime::{ApplicationRuntime, RunArgs, RuntimeConfig};
//!
//! let registry = Arc::new(ServiceRegistry::new());
//! let access = Arc::new(SharedApplicationAccess::new());
//! registry.register::<Arc<dyn ApplicationAccess>>(access)?;
//!
//! let runtime = Arc::new(ApplicationRuntime::new(logic, RuntimeConfig::default(), registry)?);
//! let controller = DaemonController::new(DaemonConfig::new("/run/myapp.pid"), runtime);
//! let code = controller.start(&RunArgs::new())?;
//! ```

pub mod config;
pub mod controller;
pub mod detach;
pub mod error;
pub mod lock;
pub mod signal;

pub use config::DaemonConfig;
pub use controller::{ControllerState, DaemonController};
pub use detach::DetachOutcome;
pub use error::DaemonError;
pub use lock::ProcessLock;
pub use signal::{DaemonSignal, Delivery, SignalDisposition, SignalTable};
