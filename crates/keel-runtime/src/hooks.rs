//! Business-logic hooks and the values forwarded to them.

use std::collections::BTreeMap;
use std::error::Error;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keel_core::{BoxError, ExitCode};

/// Arguments forwarded from the control surface to the execution call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunArgs {
    /// Positional arguments, in order.
    pub positional: Vec<String>,
    /// Named key/value arguments.
    pub named: BTreeMap<String, String>,
}

impl RunArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from positional arguments only.
    pub fn from_positional<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positional: args.into_iter().map(Into::into).collect(),
            named: BTreeMap::new(),
        }
    }

    /// Add a named argument.
    pub fn with_named(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Opaque token identifying the execution context a signal interrupted.
///
/// Carries identifiers only; a handler that needs state reaches it through
/// its own captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalContext {
    runtime_id: Uuid,
    raw_signal: i32,
}

impl SignalContext {
    pub fn new(runtime_id: Uuid, raw_signal: i32) -> Self {
        Self {
            runtime_id,
            raw_signal,
        }
    }

    /// Id of the runtime whose execution was interrupted.
    pub fn runtime_id(&self) -> Uuid {
        self.runtime_id
    }

    /// Raw OS signal number that triggered the dispatch.
    pub fn raw_signal(&self) -> i32 {
        self.raw_signal
    }
}

/// The hooks an embedding application implements.
///
/// Every method has a default so implementations override only what they
/// need. The lifecycle hooks run on the thread that owns the runtime; the
/// `on_sig*` handlers additionally run on the daemon's signal-dispatch
/// thread, which is why the trait requires `Send + Sync`.
pub trait BusinessLogic: Send + Sync {
    /// Bring up the services the logic depends on. Runs during runtime
    /// construction; a failure aborts construction.
    fn initialize_services(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs immediately before the main loop.
    fn before_main_loop(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// The application's main loop; its result becomes the exit code.
    fn main_loop(&self, args: &RunArgs) -> Result<ExitCode, BoxError> {
        let _ = args;
        Ok(ExitCode::Success)
    }

    /// Runs after the main loop returns.
    fn after_main_loop(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Observes the failure intercepted at the run boundary. Called at most
    /// once per run.
    fn on_uncaught_exception(&self, error: &(dyn Error + 'static)) {
        let _ = error;
    }

    /// SIGTERM was delivered; the process exits once this hook returns.
    fn on_sigterm(&self, ctx: SignalContext) {
        let _ = ctx;
    }

    /// SIGINT was delivered; the process exits once this hook returns.
    fn on_sigint(&self, ctx: SignalContext) {
        let _ = ctx;
    }

    /// SIGALRM was delivered.
    fn on_sigalrm(&self, ctx: SignalContext) {
        let _ = ctx;
    }

    /// SIGUSR1 was delivered.
    fn on_sigusr1(&self, ctx: SignalContext) {
        let _ = ctx;
    }

    /// SIGUSR2 was delivered.
    fn on_sigusr2(&self, ctx: SignalContext) {
        let _ = ctx;
    }
}
