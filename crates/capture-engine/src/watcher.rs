//! Geometry-following segment rotation.
//!
//! ```text
//!            window found                 geometry changed
//!   ┌──────┐ ───────────▶ ┌───────────┐ ───────────────▶ ┌──────────┐
//!   │ Idle │              │ Recording │                  │ Rotating │
//!   └──────┘ ◀─────────── └───────────┘ ◀─────────────── └──────────┘
//!            window lost / degenerate      stop → ledger → start
//!
//!   any state ── shutdown requested ──▶ Stopped
//! ```
//!
//! Every transition runs to completion inside one tick, so at most one
//! recorder is ever alive and a segment is ledgered only after its recorder
//! has exited.

use std::time::Duration;

use winrec_common::config::RecordingDefaults;
use winrec_platform_core::{GeometryProbe, WindowGeometry};

use crate::recorder::RecorderLauncher;
use crate::session::RecordingSession;

/// Watcher lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// No window tracked, no recorder running.
    Idle,
    /// A recorder is capturing the current geometry.
    Recording,
    /// Stopping the old recorder before starting one at the new geometry.
    Rotating,
    /// Terminal; the active recorder has been drained.
    Stopped,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to record.
    Idle,
    /// Geometry unchanged; the current segment continues.
    Unchanged,
    /// A new segment started from Idle.
    Started { segment: u32 },
    /// The previous segment was closed and a new one started.
    Rotated { closed: u32, started: u32 },
    /// The window disappeared (or collapsed) and the segment was closed.
    Lost { closed: u32 },
    /// A recorder could not be started; retried on the next tick.
    LaunchFailed,
    /// Shutdown observed; the watcher is stopped.
    Stopped,
}

/// Watcher tuning. The recorder stop timeout lives on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::from(&RecordingDefaults::default())
    }
}

impl From<&RecordingDefaults> for WatcherConfig {
    fn from(defaults: &RecordingDefaults) -> Self {
        Self {
            poll_interval: defaults.poll_interval(),
        }
    }
}

/// Polls the probe and drives recorder rotation for one session.
pub struct GeometryWatcher {
    session: RecordingSession,
    probe: Box<dyn GeometryProbe>,
    launcher: Box<dyn RecorderLauncher>,
    poll_interval: Duration,
    state: WatcherState,
}

impl GeometryWatcher {
    pub fn new(
        session: RecordingSession,
        probe: Box<dyn GeometryProbe>,
        launcher: Box<dyn RecorderLauncher>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            session,
            probe,
            launcher,
            poll_interval: config.poll_interval,
            state: WatcherState::Idle,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn into_session(self) -> RecordingSession {
        self.session
    }

    /// Tick until shutdown is requested, then drain the active recorder.
    pub async fn run(&mut self) {
        tracing::info!(
            probe = self.probe.name(),
            recorder = self.launcher.name(),
            interval_ms = self.poll_interval.as_millis() as u64,
            "Watching window geometry"
        );

        let signal = self.session.shutdown_signal().clone();
        while self.tick().await != TickOutcome::Stopped {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = signal.requested() => {}
            }
        }
    }

    /// Run one poll: observe shutdown, reap a crashed recorder, query the
    /// window, and apply at most one transition.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.state == WatcherState::Stopped {
            return TickOutcome::Stopped;
        }
        if !self.session.is_running() {
            self.stop().await;
            return TickOutcome::Stopped;
        }

        match self.session.reap_exited() {
            Ok(Some(_)) => self.state = WatcherState::Idle,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to ledger crashed segment");
                self.state = WatcherState::Idle;
            }
        }

        let observed = self.observe().await;
        match (self.session.last_geometry(), observed) {
            (None, None) => TickOutcome::Idle,
            (None, Some(geometry)) => self.start(geometry).await,
            (Some(_), None) => {
                let closed = self.close_active().await;
                self.state = WatcherState::Idle;
                match closed {
                    Some(closed) => TickOutcome::Lost { closed },
                    None => TickOutcome::Idle,
                }
            }
            (Some(current), Some(geometry)) if current == geometry => TickOutcome::Unchanged,
            (Some(current), Some(geometry)) => {
                tracing::info!(from = %current, to = %geometry, "Window geometry changed");
                self.state = WatcherState::Rotating;
                let closed = self.close_active().await;
                match (closed, self.start(geometry).await) {
                    (Some(closed), TickOutcome::Started { segment }) => TickOutcome::Rotated {
                        closed,
                        started: segment,
                    },
                    (_, outcome) => outcome,
                }
            }
        }
    }

    /// Drain the active recorder and enter `Stopped`. Idempotent.
    pub async fn stop(&mut self) {
        if self.state == WatcherState::Stopped && !self.session.has_active_segment() {
            return;
        }
        self.close_active().await;
        self.state = WatcherState::Stopped;
        tracing::info!(segments = self.session.ledger().len(), "Watcher stopped");
    }

    /// Query the probe, folding errors and degenerate sizes into "not found".
    async fn observe(&mut self) -> Option<WindowGeometry> {
        match self.probe.query().await {
            Ok(Some(geometry)) if geometry.is_degenerate() => {
                tracing::debug!(%geometry, "Window has no visible area; treating as lost");
                None
            }
            Ok(Some(geometry)) => Some(geometry),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(probe = self.probe.name(), error = %e, "Geometry probe failed");
                None
            }
        }
    }

    /// Start a segment unless shutdown was requested while the tick ran.
    async fn start(&mut self, geometry: WindowGeometry) -> TickOutcome {
        if !self.session.is_running() {
            self.stop().await;
            return TickOutcome::Stopped;
        }

        match self
            .session
            .start_segment(self.launcher.as_mut(), geometry)
            .await
        {
            Ok(segment) => {
                let segment = segment.index;
                self.state = WatcherState::Recording;
                TickOutcome::Started { segment }
            }
            Err(e) => {
                tracing::warn!(%geometry, error = %e, "Failed to start recorder; will retry");
                self.state = WatcherState::Idle;
                TickOutcome::LaunchFailed
            }
        }
    }

    async fn close_active(&mut self) -> Option<u32> {
        match self.session.finish_active().await {
            Ok(finished) => finished.map(|f| f.segment.index),
            Err(e) => {
                tracing::error!(error = %e, "Failed to ledger finished segment");
                None
            }
        }
    }
}
