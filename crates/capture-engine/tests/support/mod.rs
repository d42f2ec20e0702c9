//! In-process fakes for driving the watcher without real recorders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use winrec_capture_engine::{
    GeometryWatcher, Merger, RecorderHandle, RecorderLauncher, RecordingSession, SessionLayout,
    ShutdownCoordinator, ShutdownSignal, StopOutcome, WatcherConfig,
};
use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_core::{GeometryProbe, WindowGeometry};

pub const G1: WindowGeometry = WindowGeometry {
    x: 10,
    y: 20,
    width: 640,
    height: 480,
};
pub const G2: WindowGeometry = WindowGeometry {
    x: 10,
    y: 20,
    width: 800,
    height: 600,
};
pub const G3: WindowGeometry = WindowGeometry {
    x: 300,
    y: 0,
    width: 800,
    height: 600,
};

/// One scripted probe answer.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Found(WindowGeometry),
    NotFound,
    Fail,
}

/// Replays a fixed sequence of answers, then reports the window missing.
pub struct ScriptedProbe {
    steps: VecDeque<Step>,
    repeat_last: bool,
    last: Step,
}

impl ScriptedProbe {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            repeat_last: false,
            last: Step::NotFound,
        }
    }

    pub fn geometries(steps: &[Option<WindowGeometry>]) -> Self {
        Self::new(steps.iter().map(|g| match g {
            Some(g) => Step::Found(*g),
            None => Step::NotFound,
        }))
    }

    /// Keep answering with the final step once the script runs out.
    pub fn repeating(mut self) -> Self {
        self.repeat_last = true;
        self
    }
}

#[async_trait::async_trait]
impl GeometryProbe for ScriptedProbe {
    async fn query(&mut self) -> WinrecResult<Option<WindowGeometry>> {
        let step = match self.steps.pop_front() {
            Some(step) => {
                self.last = step;
                step
            }
            None if self.repeat_last => self.last,
            None => Step::NotFound,
        };
        match step {
            Step::Found(g) => Ok(Some(g)),
            Step::NotFound => Ok(None),
            Step::Fail => Err(WinrecError::probe("scripted failure")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Answers with a script and requests shutdown while answering the
/// `shutdown_at`-th query (zero-based).
pub struct InterruptingProbe {
    inner: ScriptedProbe,
    signal: ShutdownSignal,
    shutdown_at: usize,
    queries: usize,
}

impl InterruptingProbe {
    pub fn new(inner: ScriptedProbe, signal: ShutdownSignal, shutdown_at: usize) -> Self {
        Self {
            inner,
            signal,
            shutdown_at,
            queries: 0,
        }
    }
}

#[async_trait::async_trait]
impl GeometryProbe for InterruptingProbe {
    async fn query(&mut self) -> WinrecResult<Option<WindowGeometry>> {
        if self.queries == self.shutdown_at {
            self.signal.request_shutdown();
        }
        self.queries += 1;
        self.inner.query().await
    }

    fn name(&self) -> &str {
        "interrupting"
    }
}

/// Everything the fake recorders observed.
#[derive(Debug, Default)]
pub struct RecorderLog {
    pub starts: Vec<(WindowGeometry, PathBuf)>,
    pub stops: Vec<StopOutcome>,
    pub active: usize,
    pub max_active: usize,
}

/// Launches in-memory recorders that write a placeholder segment file.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub log: Arc<Mutex<RecorderLog>>,
    /// Recorders ignore the interrupt and run into the stop timeout.
    pub ignore_interrupt: bool,
    /// Number of upcoming launches that fail.
    pub failing_launches: Arc<AtomicUsize>,
    /// Makes the active recorder report that it exited on its own.
    pub crash: Arc<AtomicBool>,
}

impl FakeLauncher {
    pub fn starts(&self) -> usize {
        self.log.lock().unwrap().starts.len()
    }

    pub fn stops(&self) -> Vec<StopOutcome> {
        self.log.lock().unwrap().stops.clone()
    }

    pub fn max_active(&self) -> usize {
        self.log.lock().unwrap().max_active
    }

    pub fn active(&self) -> usize {
        self.log.lock().unwrap().active
    }
}

#[async_trait::async_trait]
impl RecorderLauncher for FakeLauncher {
    async fn start(
        &mut self,
        geometry: WindowGeometry,
        output_path: &Path,
    ) -> WinrecResult<Box<dyn RecorderHandle>> {
        let pending = self.failing_launches.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_launches.store(pending - 1, Ordering::SeqCst);
            return Err(WinrecError::launch("scripted launch failure"));
        }

        std::fs::write(output_path, b"segment")?;
        let mut log = self.log.lock().unwrap();
        log.starts.push((geometry, output_path.to_path_buf()));
        log.active += 1;
        log.max_active = log.max_active.max(log.active);

        Ok(Box::new(FakeRecorder {
            log: Arc::clone(&self.log),
            ignore_interrupt: self.ignore_interrupt,
            crash: Arc::clone(&self.crash),
            exited: false,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeRecorder {
    log: Arc<Mutex<RecorderLog>>,
    ignore_interrupt: bool,
    crash: Arc<AtomicBool>,
    exited: bool,
}

#[async_trait::async_trait]
impl RecorderHandle for FakeRecorder {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn has_exited(&mut self) -> bool {
        if self.crash.swap(false, Ordering::SeqCst) {
            self.exited = true;
        }
        self.exited
    }

    async fn stop_graceful(&mut self, timeout: Duration) -> WinrecResult<StopOutcome> {
        let outcome = if self.exited {
            StopOutcome::AlreadyExited
        } else if self.ignore_interrupt {
            tokio::time::sleep(timeout).await;
            StopOutcome::Forced
        } else {
            StopOutcome::Graceful
        };
        self.exited = true;
        self.log.lock().unwrap().stops.push(outcome);
        Ok(outcome)
    }
}

impl Drop for FakeRecorder {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.active -= 1;
        }
    }
}

/// Counts concat invocations and writes a stub output.
#[derive(Clone, Default)]
pub struct FakeMerger {
    pub concats: Arc<AtomicUsize>,
    pub fail: bool,
}

impl FakeMerger {
    pub fn concats(&self) -> usize {
        self.concats.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Merger for FakeMerger {
    async fn is_readable(&self, _segment: &Path) -> bool {
        true
    }

    async fn concat(&self, _list_file: &Path, output: &Path) -> WinrecResult<()> {
        self.concats.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WinrecError::merge("scripted merge failure"));
        }
        std::fs::write(output, b"merged")?;
        Ok(())
    }
}

/// Scratch directories for one test: a work dir and an output dir.
pub struct Scratch {
    pub root: PathBuf,
}

impl Scratch {
    pub fn new(name: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let root = std::env::temp_dir().join(format!(
            "winrec_test_{name}_{}_{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("out")).unwrap();
        Self { root }
    }

    pub fn layout(&self) -> SessionLayout {
        SessionLayout::from_work_dir(
            self.root.join("work"),
            self.root.join("out").join("recording.mp4"),
            "mp4",
        )
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// A watcher and coordinator wired to the fakes.
pub struct Harness {
    pub watcher: GeometryWatcher,
    pub coordinator: ShutdownCoordinator,
    pub signal: ShutdownSignal,
    pub launcher: FakeLauncher,
    pub merger: FakeMerger,
    pub layout: SessionLayout,
    pub scratch: Scratch,
}

impl Harness {
    pub fn new(name: &str, probe: ScriptedProbe, launcher: FakeLauncher, merger: FakeMerger) -> Self {
        Self::with_signal(name, ShutdownSignal::new(), probe, launcher, merger)
    }

    /// Like [`Harness::new`], sharing `signal` with the caller.
    pub fn with_signal(
        name: &str,
        signal: ShutdownSignal,
        probe: impl GeometryProbe + 'static,
        launcher: FakeLauncher,
        merger: FakeMerger,
    ) -> Self {
        let scratch = Scratch::new(name);
        let layout = scratch.layout();
        let session =
            RecordingSession::create(layout.clone(), signal.clone(), Duration::from_millis(50))
                .unwrap();
        let watcher = GeometryWatcher::new(
            session,
            Box::new(probe),
            Box::new(launcher.clone()),
            WatcherConfig {
                poll_interval: Duration::from_millis(10),
            },
        );
        let coordinator = ShutdownCoordinator::new(signal.clone(), Box::new(merger.clone()));

        Self {
            watcher,
            coordinator,
            signal,
            launcher,
            merger,
            layout,
            scratch,
        }
    }

    pub fn ledger_indices(&self) -> Vec<u32> {
        self.watcher
            .session()
            .ledger()
            .entries()
            .iter()
            .map(|e| e.index)
            .collect()
    }
}
