//! Recording session state.
//!
//! A [`RecordingSession`] is owned by the geometry watcher while it runs and
//! handed to the shutdown coordinator afterwards, so exactly one party can
//! mutate the active recorder and the ledger at any time.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use winrec_common::clock::SessionClock;
use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_core::WindowGeometry;

use crate::ledger::SegmentLedger;
use crate::recorder::{RecorderHandle, RecorderLauncher, StopOutcome};
use crate::shutdown::ShutdownSignal;

/// Prefix of the per-session temporary directory name.
pub const WORK_DIR_PREFIX: &str = "window_recording_";

/// On-disk layout of one recording session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    /// Temporary directory holding segments and the ledger.
    pub work_dir: PathBuf,
    /// `segments.txt` inside `work_dir`.
    pub ledger_path: PathBuf,
    /// Concat-demuxer list written just before merging.
    pub concat_list_path: PathBuf,
    /// Final merged recording.
    pub output_path: PathBuf,
    /// Container extension without the dot, e.g. `mp4`.
    pub container: String,
}

impl SessionLayout {
    /// Layout for a new session started at `clock`.
    pub fn new(work_root: &Path, output_dir: &Path, clock: &SessionClock, container: &str) -> Self {
        let stamp = clock.stamp();
        Self::from_work_dir(
            work_root.join(format!("{WORK_DIR_PREFIX}{stamp}")),
            output_dir.join(format!("recording_{stamp}.{container}")),
            container,
        )
    }

    /// Layout around an existing work directory (crash recovery).
    pub fn from_work_dir(work_dir: PathBuf, output_path: PathBuf, container: &str) -> Self {
        Self {
            ledger_path: work_dir.join("segments.txt"),
            concat_list_path: work_dir.join("concat.txt"),
            work_dir,
            output_path,
            container: container.to_string(),
        }
    }

    /// Session timestamp recovered from the work directory name.
    pub fn stamp(&self) -> Option<&str> {
        self.work_dir
            .file_name()?
            .to_str()?
            .strip_prefix(WORK_DIR_PREFIX)
    }

    /// `segment_<index>.<ext>` inside the work directory.
    pub fn segment_path(&self, index: u32) -> PathBuf {
        self.work_dir
            .join(format!("segment_{index}.{}", self.container))
    }
}

/// One continuous recorded interval bound to a single geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub path: PathBuf,
    pub geometry: WindowGeometry,
}

struct ActiveSegment {
    segment: Segment,
    recorder: Box<dyn RecorderHandle>,
    started: Instant,
}

/// Result of stopping and ledgering the active segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSegment {
    pub segment: Segment,
    /// `None` when waiting on the recorder failed outright.
    pub outcome: Option<StopOutcome>,
    pub duration: Duration,
}

/// Mutable state of a running recording.
pub struct RecordingSession {
    layout: SessionLayout,
    ledger: SegmentLedger,
    active: Option<ActiveSegment>,
    last_geometry: Option<WindowGeometry>,
    last_index: u32,
    shutdown: ShutdownSignal,
    stop_timeout: Duration,
}

impl RecordingSession {
    /// Create the work directory and open its ledger.
    pub fn create(
        layout: SessionLayout,
        shutdown: ShutdownSignal,
        stop_timeout: Duration,
    ) -> WinrecResult<Self> {
        std::fs::create_dir_all(&layout.work_dir).map_err(|e| {
            WinrecError::platform(format!(
                "Failed to create work directory {}: {e}",
                layout.work_dir.display()
            ))
        })?;
        let ledger = SegmentLedger::open(&layout.ledger_path)?;
        let last_index = ledger.last_index();

        Ok(Self {
            layout,
            ledger,
            active: None,
            last_geometry: None,
            last_index,
            shutdown,
            stop_timeout,
        })
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    pub fn ledger(&self) -> &SegmentLedger {
        &self.ledger
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// False once shutdown has been requested.
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Geometry of the active segment, `None` when no window is tracked.
    pub fn last_geometry(&self) -> Option<WindowGeometry> {
        self.last_geometry
    }

    pub fn active_segment(&self) -> Option<&Segment> {
        self.active.as_ref().map(|a| &a.segment)
    }

    pub fn has_active_segment(&self) -> bool {
        self.active.is_some()
    }

    /// Start the next segment. Fails if a recorder is still active.
    pub async fn start_segment(
        &mut self,
        launcher: &mut dyn RecorderLauncher,
        geometry: WindowGeometry,
    ) -> WinrecResult<&Segment> {
        if let Some(active) = &self.active {
            return Err(WinrecError::launch(format!(
                "Segment {} is still recording",
                active.segment.index
            )));
        }

        let index = self.last_index + 1;
        let path = self.layout.segment_path(index);
        if path.exists() {
            // Left over from a recorder that failed to start.
            let _ = std::fs::remove_file(&path);
        }

        let recorder = launcher.start(geometry, &path).await?;
        tracing::info!(
            segment = index,
            geometry = %geometry,
            pid = recorder.pid(),
            "Recording segment"
        );

        self.last_index = index;
        self.last_geometry = Some(geometry);
        let active = self.active.insert(ActiveSegment {
            segment: Segment {
                index,
                path,
                geometry,
            },
            recorder,
            started: Instant::now(),
        });
        Ok(&active.segment)
    }

    /// Stop the active recorder and, only once it has exited, ledger its
    /// segment. Returns `None` when nothing was recording.
    pub async fn finish_active(&mut self) -> WinrecResult<Option<FinishedSegment>> {
        let Some(mut active) = self.active.take() else {
            return Ok(None);
        };
        self.last_geometry = None;

        let outcome = match active.recorder.stop_graceful(self.stop_timeout).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(
                    segment = active.segment.index,
                    error = %e,
                    "Failed to stop recorder cleanly; ledgering best-effort segment"
                );
                None
            }
        };
        // Dropping the handle releases the process on every path.
        drop(active.recorder);

        self.ledger_finished(active.segment, outcome, active.started.elapsed())
            .map(Some)
    }

    /// Ledger the active segment if its recorder exited on its own.
    pub fn reap_exited(&mut self) -> WinrecResult<Option<FinishedSegment>> {
        let exited = self
            .active
            .as_mut()
            .map(|a| a.recorder.has_exited())
            .unwrap_or(false);
        if !exited {
            return Ok(None);
        }

        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        self.last_geometry = None;
        tracing::warn!(
            segment = active.segment.index,
            "Recorder exited unexpectedly; closing segment"
        );
        self.ledger_finished(
            active.segment,
            Some(StopOutcome::AlreadyExited),
            active.started.elapsed(),
        )
        .map(Some)
    }

    fn ledger_finished(
        &mut self,
        segment: Segment,
        outcome: Option<StopOutcome>,
        duration: Duration,
    ) -> WinrecResult<FinishedSegment> {
        self.ledger.append(&segment)?;

        if outcome.map_or(true, |o| o.is_forced()) {
            tracing::warn!(
                segment = segment.index,
                path = %segment.path.display(),
                "Segment ledgered after an ungraceful stop; it may be unreadable"
            );
        } else {
            tracing::info!(
                segment = segment.index,
                duration_secs = duration.as_secs_f64(),
                "Segment closed"
            );
        }

        Ok(FinishedSegment {
            segment,
            outcome,
            duration,
        })
    }
}
