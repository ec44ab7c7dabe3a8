use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Instant;

use tempfile::TempDir;

use keel_core::{ApplicationAccess, BoxError, ServiceRegistry, SharedApplicationAccess};
use keel_runtime::{BusinessLogic, RuntimeConfig};

use super::*;

struct NoopLogic;

impl BusinessLogic for NoopLogic {}

struct BlockingLogic {
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl BlockingLogic {
    fn new() -> (Arc<Self>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let logic = Arc::new(Self {
            release: Mutex::new(Some(rx)),
        });
        (logic, tx)
    }
}

impl BusinessLogic for BlockingLogic {
    fn main_loop(&self, _args: &RunArgs) -> Result<ExitCode, BoxError> {
        if let Some(rx) = self.release.lock().unwrap().take() {
            let _ = rx.recv();
        }
        Ok(ExitCode::Success)
    }
}

#[derive(Clone)]
struct FakeSender {
    state: Arc<FakeState>,
}

struct FakeState {
    remaining: Mutex<u32>,
    log: Mutex<Vec<&'static str>>,
}

impl FakeSender {
    /// Sender whose target accepts `deliveries` signals and then is gone.
    fn new(deliveries: u32) -> Self {
        Self {
            state: Arc::new(FakeState {
                remaining: Mutex::new(deliveries),
                log: Mutex::new(Vec::new()),
            }),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.state.log.lock().unwrap().clone()
    }

    fn deliver(&self, kind: &'static str) -> Result<Delivery, DaemonError> {
        self.state.log.lock().unwrap().push(kind);
        let mut remaining = self.state.remaining.lock().unwrap();
        if *remaining == 0 {
            return Ok(Delivery::NoSuchProcess);
        }
        *remaining -= 1;
        Ok(Delivery::Delivered)
    }
}

impl SignalSender for FakeSender {
    fn send_term(&self, _pid: u32) -> Result<Delivery, DaemonError> {
        self.deliver("TERM")
    }

    fn send_hup(&self, _pid: u32) -> Result<Delivery, DaemonError> {
        self.deliver("HUP")
    }
}

struct ErrSender;

impl SignalSender for ErrSender {
    fn send_term(&self, pid: u32) -> Result<Delivery, DaemonError> {
        Err(DaemonError::SignalDelivery {
            pid,
            reason: "operation not permitted".to_string(),
        })
    }

    fn send_hup(&self, pid: u32) -> Result<Delivery, DaemonError> {
        Err(DaemonError::SignalDelivery {
            pid,
            reason: "operation not permitted".to_string(),
        })
    }
}

fn runtime_with(logic: Arc<dyn BusinessLogic>) -> Arc<ApplicationRuntime> {
    let registry = Arc::new(ServiceRegistry::new());
    let access = Arc::new(SharedApplicationAccess::new());
    registry
        .register::<Arc<dyn ApplicationAccess>>(access)
        .unwrap();
    Arc::new(ApplicationRuntime::new(logic, RuntimeConfig::default(), registry).unwrap())
}

fn foreground_controller() -> (TempDir, DaemonController) {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig::new(dir.path().join("keeld.pid")).with_detach(false);
    let controller = DaemonController::new(config, runtime_with(Arc::new(NoopLogic)));
    (dir, controller)
}

fn lock_of(controller: &DaemonController) -> ProcessLock {
    ProcessLock::new(controller.config().pid_file())
}

#[test]
fn test_controller_state_conversion() {
    assert_eq!(ControllerState::from(0), ControllerState::Stopped);
    assert_eq!(ControllerState::from(1), ControllerState::Forking);
    assert_eq!(ControllerState::from(2), ControllerState::Running);
    assert_eq!(ControllerState::from(99), ControllerState::Stopped);
}

#[test]
fn test_controller_state_display() {
    assert_eq!(ControllerState::Stopped.to_string(), "stopped");
    assert_eq!(ControllerState::Forking.to_string(), "forking");
    assert_eq!(ControllerState::Running.to_string(), "running");
}

#[test]
fn test_controller_initial_state() {
    let (_dir, controller) = foreground_controller();
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert!(!controller.is_running());
    assert_eq!(controller.status(), "not running");
}

#[test]
fn test_start_refuses_on_existing_lock() {
    let (_dir, controller) = foreground_controller();
    lock_of(&controller).write(4242).unwrap();

    // The PID is stale, but no liveness probe happens here.
    let err = controller.start(&RunArgs::new()).unwrap_err();
    match err {
        DaemonError::AlreadyRunning { path, pid } => {
            assert_eq!(path, controller.config().pid_file());
            assert_eq!(pid, 4242);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(controller.state(), ControllerState::Stopped);
    assert_eq!(lock_of(&controller).read(), Some(4242));
}

#[test]
fn test_foreground_start_runs_to_completion() {
    let (_dir, controller) = foreground_controller();

    let code = controller.start(&RunArgs::new()).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(controller.state(), ControllerState::Stopped);
    // The lock lives until process exit; in-process it is still ours.
    assert_eq!(lock_of(&controller).read(), Some(std::process::id()));
    assert!(controller.is_running());
}

#[test]
fn test_second_start_refused_by_own_lock() {
    let (_dir, controller) = foreground_controller();
    controller.start(&RunArgs::new()).unwrap();

    let err = controller.start(&RunArgs::new()).unwrap_err();
    match err {
        DaemonError::AlreadyRunning { pid, .. } => assert_eq!(pid, std::process::id()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_start_refused_while_running() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig::new(dir.path().join("keeld.pid")).with_detach(false);
    let (logic, release) = BlockingLogic::new();
    let controller = Arc::new(DaemonController::new(config, runtime_with(logic)));

    let background = {
        let controller = controller.clone();
        std::thread::spawn(move || controller.start(&RunArgs::new()))
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while controller.state() != ControllerState::Running {
        assert!(Instant::now() < deadline, "daemon never reached running");
        std::thread::sleep(Duration::from_millis(10));
    }

    let err = controller.start(&RunArgs::new()).unwrap_err();
    match err {
        DaemonError::InvalidStateTransition { from, to } => {
            assert_eq!(from, ControllerState::Running);
            assert_eq!(to, ControllerState::Forking);
        }
        other => panic!("unexpected error: {other}"),
    }

    release.send(()).unwrap();
    let code = background.join().unwrap().unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(controller.state(), ControllerState::Stopped);
}

#[test]
fn test_stop_without_lock_is_not_running() {
    let (_dir, controller) = foreground_controller();

    let err = controller.stop().unwrap_err();
    match err {
        DaemonError::NotRunning { path } => assert_eq!(path, controller.config().pid_file()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stop_with_corrupt_lock_is_not_running() {
    let (_dir, controller) = foreground_controller();
    std::fs::write(controller.config().pid_file(), "not a pid\n").unwrap();

    assert!(matches!(
        controller.stop().unwrap_err(),
        DaemonError::NotRunning { .. }
    ));
    // Ownership-gated cleanup does not touch a file it cannot attribute.
    assert!(controller.config().pid_file().exists());
}

#[test]
fn test_stop_clears_own_lock() {
    let (_dir, controller) = foreground_controller();
    let fake = FakeSender::new(0);
    let controller = controller.with_signal_sender(Box::new(fake.clone()));
    lock_of(&controller).write(std::process::id()).unwrap();

    controller.stop().unwrap();

    assert_eq!(fake.calls(), vec!["TERM"]);
    assert!(!controller.config().pid_file().exists());
}

#[test]
fn test_stop_leaves_foreign_lock_in_place() {
    let (_dir, controller) = foreground_controller();
    let fake = FakeSender::new(0);
    let controller = controller.with_signal_sender(Box::new(fake.clone()));
    lock_of(&controller).write(4242).unwrap();

    controller.stop().unwrap();

    assert_eq!(lock_of(&controller).read(), Some(4242));
}

#[test]
fn test_stop_escalates_with_hup_every_tenth_iteration() {
    let (_dir, controller) = foreground_controller();
    let fake = FakeSender::new(12);
    let controller = controller.with_signal_sender(Box::new(fake.clone()));
    lock_of(&controller).write(4242).unwrap();

    controller.stop().unwrap();

    let log = fake.calls();
    assert_eq!(log.len(), 13);
    assert!(log[..10].iter().all(|kind| *kind == "TERM"));
    assert_eq!(log[10], "HUP");
    assert_eq!(log[11], "TERM");
    assert_eq!(log[12], "TERM");
}

#[test]
fn test_stop_aborts_on_delivery_error() {
    let (_dir, controller) = foreground_controller();
    let controller = controller.with_signal_sender(Box::new(ErrSender));
    lock_of(&controller).write(4242).unwrap();

    let err = controller.stop().unwrap_err();
    match err {
        DaemonError::SignalDelivery { pid, .. } => assert_eq!(pid, 4242),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(lock_of(&controller).read(), Some(4242));
}

#[test]
fn test_restart_propagates_not_running() {
    let (_dir, controller) = foreground_controller();

    assert!(matches!(
        controller.restart(&RunArgs::new()).unwrap_err(),
        DaemonError::NotRunning { .. }
    ));
}

#[test]
fn test_restart_stops_then_starts() {
    let (_dir, controller) = foreground_controller();
    let fake = FakeSender::new(0);
    let controller = controller.with_signal_sender(Box::new(fake.clone()));
    lock_of(&controller).write(std::process::id()).unwrap();

    let code = controller.restart(&RunArgs::new()).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fake.calls(), vec!["TERM"]);
    assert_eq!(lock_of(&controller).read(), Some(std::process::id()));
}

#[test]
fn test_status_reports_lock_contents_without_liveness() {
    let (_dir, controller) = foreground_controller();
    assert_eq!(controller.status(), "not running");

    lock_of(&controller).write(4242).unwrap();
    assert_eq!(controller.status(), "running with PID 4242");
}

#[test]
fn test_is_running_true_for_live_pid() {
    let (_dir, controller) = foreground_controller();
    lock_of(&controller).write(std::process::id()).unwrap();
    assert!(controller.is_running());
}

#[cfg(unix)]
#[test]
fn test_is_running_false_for_stale_lock() {
    let (_dir, controller) = foreground_controller();
    lock_of(&controller).write(i32::MAX as u32).unwrap();

    // status still reports the stale PID; only is_running probes the OS.
    assert!(!controller.is_running());
    assert_eq!(controller.status(), format!("running with PID {}", i32::MAX));
}
