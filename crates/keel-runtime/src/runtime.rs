//! Application runtime: construction, execution, termination.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use keel_core::{
    ApplicationAccess, ApplicationInfo, BoxError, ConfigurationProvider, ExitCode, ServiceRegistry,
    TelemetrySink,
};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::hooks::{BusinessLogic, RunArgs};

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;

/// Runtime state. States advance forward only; none is ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RuntimeState {
    /// Constructed, services not yet initialized.
    Constructed = 0,
    /// Services are up; ready to run.
    ServicesInitialized = 1,
    /// The business logic is executing.
    Running = 2,
    /// Execution finished; the terminal exit code is retained.
    Terminated = 3,
}

impl From<u8> for RuntimeState {
    fn from(v: u8) -> Self {
        match v {
            0 => RuntimeState::Constructed,
            1 => RuntimeState::ServicesInitialized,
            2 => RuntimeState::Running,
            3 => RuntimeState::Terminated,
            _ => RuntimeState::Constructed,
        }
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeState::Constructed => "constructed",
            RuntimeState::ServicesInitialized => "services_initialized",
            RuntimeState::Running => "running",
            RuntimeState::Terminated => "terminated",
        };
        write!(f, "{}", name)
    }
}

/// Failure representation for a panic that unwound out of a hook.
#[derive(Debug, Error)]
#[error("Panic in business logic: {message}")]
struct HookPanic {
    message: String,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The application shell: owns the business logic and drives it through the
/// `Constructed → ServicesInitialized → Running → Terminated` lifecycle.
pub struct ApplicationRuntime {
    id: Uuid,
    config: RuntimeConfig,
    logic: Arc<dyn BusinessLogic>,
    registry: Arc<ServiceRegistry>,
    state: AtomicU8,
    terminal_code: Mutex<Option<ExitCode>>,
}

impl ApplicationRuntime {
    /// Construct a runtime: validate configuration preconditions, initialize
    /// the business logic's services, publish the application handle.
    ///
    /// Fails fast; no partial runtime is ever produced. A missing
    /// application-access service is fatal because nothing else could reach
    /// the runtime afterwards.
    pub fn new(
        logic: Arc<dyn BusinessLogic>,
        config: RuntimeConfig,
        registry: Arc<ServiceRegistry>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let runtime = Self {
            id: Uuid::new_v4(),
            config,
            logic,
            registry,
            state: AtomicU8::new(RuntimeState::Constructed as u8),
            terminal_code: Mutex::new(None),
        };

        runtime
            .logic
            .initialize_services()
            .map_err(|source| RuntimeError::ServiceInitialization { source })?;

        let access = runtime
            .registry
            .lookup::<Arc<dyn ApplicationAccess>>()
            .ok_or(RuntimeError::RegistryUnavailable)?;
        access.publish(runtime.info());

        if runtime.config.telemetry_endpoint.is_some()
            && !runtime.registry.contains::<Arc<dyn TelemetrySink>>()
        {
            warn!("Telemetry endpoint configured but no telemetry sink is registered");
        }

        runtime.set_state(RuntimeState::ServicesInitialized);
        debug!("Application runtime {} initialized", runtime.id);
        Ok(runtime)
    }

    /// Unique id of this runtime instance.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        self.state.load(Ordering::SeqCst).into()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Handle to the business logic driving this runtime.
    pub fn logic(&self) -> Arc<dyn BusinessLogic> {
        self.logic.clone()
    }

    /// Terminal exit code, once the runtime has terminated.
    pub fn exit_code(&self) -> Option<ExitCode> {
        *self.terminal_code.lock()
    }

    fn set_state(&self, state: RuntimeState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn info(&self) -> ApplicationInfo {
        ApplicationInfo {
            runtime_id: self.id,
            pid: std::process::id(),
            debug_mode: self.config.debug_mode,
            service_directory: self.config.service_directory.clone(),
            config_directory: self.config.config_directory.clone(),
            data_directory: self.config.data_directory.clone(),
            started_at: Utc::now(),
        }
    }

    /// Execute the business logic: configuration load, then
    /// `before_main_loop → main_loop → after_main_loop` behind a single
    /// interception boundary.
    ///
    /// Never raises. A failure inside the hook sequence (error return or
    /// panic) short-circuits the remaining hooks, is reported exactly once
    /// to `on_uncaught_exception` and the telemetry sink, and becomes
    /// [`ExitCode::UncaughtException`].
    pub fn run(&self, args: &RunArgs) -> ExitCode {
        if self.state() != RuntimeState::ServicesInitialized {
            error!("Cannot run application from state {}", self.state());
            return ExitCode::GenericFailure;
        }

        self.load_configuration();

        self.set_state(RuntimeState::Running);
        info!("Application runtime {} entering main loop", self.id);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_hooks(args)));
        let code = match outcome {
            Ok(Ok(code)) => code,
            Ok(Err(error)) => self.intercept(error),
            Err(payload) => self.intercept(Box::new(HookPanic {
                message: panic_message(payload),
            })),
        };

        *self.terminal_code.lock() = Some(code);
        self.set_state(RuntimeState::Terminated);
        info!(
            "Application runtime {} terminated with exit code {}",
            self.id,
            code.code()
        );
        code
    }

    fn run_hooks(&self, args: &RunArgs) -> Result<ExitCode, BoxError> {
        self.logic.before_main_loop()?;
        let code = self.logic.main_loop(args)?;
        self.logic.after_main_loop()?;
        Ok(code)
    }

    /// The single interception point: hook dispatch and telemetry both
    /// happen here and nowhere else.
    fn intercept(&self, error: BoxError) -> ExitCode {
        error!("Uncaught failure in business logic: {}", error);
        self.logic.on_uncaught_exception(error.as_ref());
        if let Some(sink) = self.registry.lookup::<Arc<dyn TelemetrySink>>() {
            sink.report_exception(error.as_ref());
        }
        ExitCode::UncaughtException
    }

    /// Configuration load sits outside the interception boundary: a missing
    /// provider or a failing load is reported and tolerated.
    fn load_configuration(&self) {
        match self.registry.lookup::<Arc<dyn ConfigurationProvider>>() {
            Some(provider) => {
                if let Err(error) = provider.load() {
                    error!("Configuration load failed: {}", error);
                }
            }
            None => error!("No configuration provider is registered"),
        }
    }
}
