//! winrec capture engine
//!
//! Follows one window's geometry and records it as a sequence of segments,
//! one recorder process per geometry, then merges the ledgered segments into
//! a single file on shutdown.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 GeometryWatcher                  │
//! │  ┌───────────────┐        ┌───────────────────┐  │
//! │  │ GeometryProbe │──poll─▶│ RecordingSession  │  │
//! │  └───────────────┘        │  ┌─────────────┐  │  │
//! │                           │  │ Recorder    │  │  │
//! │                           │  │ (1 active)  │  │  │
//! │                           │  └──────┬──────┘  │  │
//! │                           │         ▼ stop    │  │
//! │                           │  ┌─────────────┐  │  │
//! │                           │  │SegmentLedger│  │  │
//! │                           │  └─────────────┘  │  │
//! │                           └───────────────────┘  │
//! └────────────────────────┬─────────────────────────┘
//!                          ▼ shutdown
//!               ┌────────────────────────┐
//!               │  ShutdownCoordinator   │
//!               │  merge → remove workdir│
//!               └────────────────────────┘
//! ```

pub mod ledger;
pub mod merge;
pub mod recorder;
pub mod session;
pub mod shutdown;
pub mod watcher;

pub use ledger::{LedgerEntry, SegmentLedger};
pub use merge::{FfmpegMerger, MergeOutcome, MergeReport, Merger};
pub use recorder::{
    backend_for, ProcessLauncher, RecorderBackend, RecorderHandle, RecorderLauncher,
    RecorderSettings, StopOutcome,
};
pub use session::{FinishedSegment, RecordingSession, Segment, SessionLayout};
pub use shutdown::{
    finalize_ledger, spawn_signal_listener, ShutdownCoordinator, ShutdownReport, ShutdownSignal,
};
pub use watcher::{GeometryWatcher, TickOutcome, WatcherConfig, WatcherState};
