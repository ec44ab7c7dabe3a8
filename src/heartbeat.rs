//! Reference business logic hosted by keeld.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use keel_core::{BoxError, ExitCode};
use keel_runtime::{BusinessLogic, RunArgs, SignalContext};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Slice the interval so shutdown requests are noticed promptly.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Periodic heartbeat application.
///
/// Logs a heartbeat at a fixed interval until asked to shut down. The
/// interval comes from the named `interval` argument (seconds) when present.
/// USR1 reports uptime; TERM and INT request a cooperative shutdown.
pub(crate) struct HeartbeatLogic {
    started: Instant,
    beats: AtomicU64,
    shutdown: AtomicBool,
}

impl HeartbeatLogic {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            beats: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    fn interval(&self, args: &RunArgs) -> Duration {
        match args.named.get("interval").map(|v| v.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                warn!("Invalid heartbeat interval argument, using default");
                DEFAULT_INTERVAL
            }
            None => DEFAULT_INTERVAL,
        }
    }

    fn wait(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        while Instant::now() < deadline {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(POLL_SLICE);
        }
    }
}

impl BusinessLogic for HeartbeatLogic {
    fn before_main_loop(&self) -> Result<(), BoxError> {
        info!("Heartbeat starting");
        Ok(())
    }

    fn main_loop(&self, args: &RunArgs) -> Result<ExitCode, BoxError> {
        let interval = self.interval(args);
        if !args.positional.is_empty() {
            info!("Forwarded arguments: {:?}", args.positional);
        }

        while !self.shutdown.load(Ordering::SeqCst) {
            let beat = self.beats.fetch_add(1, Ordering::SeqCst) + 1;
            info!(
                "Heartbeat {} (uptime: {}s)",
                beat,
                self.started.elapsed().as_secs()
            );
            self.wait(interval);
        }

        info!(
            "Heartbeat shutting down after {} beats",
            self.beats.load(Ordering::SeqCst)
        );
        Ok(ExitCode::Success)
    }

    fn after_main_loop(&self) -> Result<(), BoxError> {
        info!("Heartbeat stopped");
        Ok(())
    }

    fn on_uncaught_exception(&self, error: &(dyn std::error::Error + 'static)) {
        error!("Heartbeat failed: {}", error);
    }

    fn on_sigterm(&self, _ctx: SignalContext) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn on_sigint(&self, _ctx: SignalContext) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn on_sigusr1(&self, ctx: SignalContext) {
        info!(
            "Runtime {} up {}s, {} beats",
            ctx.runtime_id(),
            self.started.elapsed().as_secs(),
            self.beats.load(Ordering::SeqCst)
        );
    }
}
