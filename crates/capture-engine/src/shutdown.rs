//! Shutdown requests, final merge, and work-directory cleanup.
//!
//! Signal handlers only flip the shared [`ShutdownSignal`]. The watcher
//! observes it at the next tick boundary (or wakes from its sleep), drains
//! the active recorder, and the [`ShutdownCoordinator`] then merges the
//! ledger and removes the temporary directory exactly once.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use winrec_common::error::WinrecResult;

use crate::ledger::LedgerEntry;
use crate::merge::{merge_segments, MergeOutcome, MergeReport, Merger};
use crate::session::SessionLayout;
use crate::watcher::GeometryWatcher;

/// Shared "keep running" flag with wake-up support.
///
/// Cloning is cheap; every clone observes the same request.
#[derive(Clone)]
pub struct ShutdownSignal {
    requested: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            requested: Arc::new(tx),
        }
    }

    /// Request shutdown. Returns `true` only for the first request.
    pub fn request_shutdown(&self) -> bool {
        self.requested.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }

    pub fn is_running(&self) -> bool {
        !*self.requested.borrow()
    }

    /// Resolves once shutdown has been requested (immediately if it already was).
    pub async fn requested(&self) {
        let mut rx = self.requested.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Forward SIGINT/SIGTERM to `signal`. Repeated signals are logged and
/// otherwise ignored.
pub fn spawn_signal_listener(signal: ShutdownSignal) -> WinrecResult<JoinHandle<()>> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut interrupt = unix_signal(SignalKind::interrupt())?;
    let mut terminate = unix_signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                else => break,
            };
            if signal.request_shutdown() {
                tracing::info!(signal = name, "Shutdown requested; finishing current segment");
            } else {
                tracing::info!(signal = name, "Shutdown already in progress");
            }
        }
    }))
}

/// What the final shutdown step did.
#[derive(Debug)]
pub struct ShutdownReport {
    /// Segments in the ledger when merging started.
    pub segments_ledgered: usize,
    /// Merge result; an error here means segments were preserved.
    pub merge: WinrecResult<MergeReport>,
    /// Whether the temporary work directory was deleted.
    pub work_dir_removed: bool,
}

impl ShutdownReport {
    pub fn output(&self) -> Option<&Path> {
        match &self.merge {
            Ok(MergeReport {
                outcome: MergeOutcome::Merged { output, .. },
                ..
            }) => Some(output),
            _ => None,
        }
    }
}

/// Drains the watcher, merges the ledger, and cleans up, exactly once.
pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
    merger: Box<dyn Merger>,
    finished: bool,
}

impl ShutdownCoordinator {
    pub fn new(signal: ShutdownSignal, merger: Box<dyn Merger>) -> Self {
        Self {
            signal,
            merger,
            finished: false,
        }
    }

    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    /// Idempotent; safe to call while a watcher tick is in flight.
    pub fn request_shutdown(&self) -> bool {
        self.signal.request_shutdown()
    }

    /// Stop the watcher's active recorder, ledger it, merge, and clean up.
    ///
    /// Returns `None` if shutdown already completed.
    pub async fn finish(&mut self, watcher: &mut GeometryWatcher) -> Option<ShutdownReport> {
        self.request_shutdown();
        if self.finished {
            tracing::debug!("Shutdown already finished");
            return None;
        }
        self.finished = true;

        watcher.stop().await;
        let session = watcher.session();
        Some(
            finalize_ledger(
                self.merger.as_ref(),
                session.ledger().entries(),
                session.layout(),
            )
            .await,
        )
    }
}

/// Merge `entries` into the layout's output and remove the work directory
/// when the merge succeeded. A failed merge leaves every file in place.
pub async fn finalize_ledger(
    merger: &dyn Merger,
    entries: &[LedgerEntry],
    layout: &SessionLayout,
) -> ShutdownReport {
    let merge = merge_segments(
        merger,
        entries,
        &layout.concat_list_path,
        &layout.output_path,
    )
    .await;

    let work_dir_removed = match &merge {
        Ok(report) => {
            if let MergeOutcome::Merged { output, segments } = &report.outcome {
                tracing::info!(output = %output.display(), segments, "Recording saved");
            }
            remove_work_dir(&layout.work_dir)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                work_dir = %layout.work_dir.display(),
                "Merge failed; keeping segments for manual recovery"
            );
            false
        }
    };

    ShutdownReport {
        segments_ledgered: entries.len(),
        merge,
        work_dir_removed,
    }
}

fn remove_work_dir(work_dir: &Path) -> bool {
    match std::fs::remove_dir_all(work_dir) {
        Ok(()) => {
            tracing::debug!(path = %work_dir.display(), "Removed work directory");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %work_dir.display(), error = %e, "Failed to remove work directory");
            false
        }
    }
}
