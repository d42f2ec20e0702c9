//! Session clock and timestamp naming.
//!
//! A recording session is anchored to the wall-clock moment it started.
//! That moment names the temporary working directory and the final output
//! file, and a monotonic epoch beside it measures segment durations.

use std::time::Instant;

use chrono::{DateTime, Local};

/// Format used for session directory and output file names.
pub const SESSION_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A clock anchored to the start of a recording session.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,
    started_at: DateTime<Local>,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            started_at: Local::now(),
        }
    }

    /// Create a clock from a known wall-clock start (for recovery and tests).
    pub fn from_wall(started_at: DateTime<Local>) -> Self {
        Self {
            epoch: Instant::now(),
            started_at,
        }
    }

    /// Session timestamp, e.g. `20240101_120000`.
    pub fn stamp(&self) -> String {
        self.started_at.format(SESSION_STAMP_FORMAT).to_string()
    }

    /// Wall-clock time at session start (RFC 3339).
    pub fn started_at_rfc3339(&self) -> String {
        self.started_at.to_rfc3339()
    }

    /// Seconds elapsed since session start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}
