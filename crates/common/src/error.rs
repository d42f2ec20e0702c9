//! Error types shared across winrec crates.

use std::path::PathBuf;

/// Top-level error type for winrec operations.
#[derive(Debug, thiserror::Error)]
pub enum WinrecError {
    /// The window geometry query failed. Never escapes a watcher tick.
    #[error("Geometry probe error: {message}")]
    Probe { message: String },

    /// A recorder could not be started for a segment.
    #[error("Recorder launch error: {message}")]
    Launch { message: String },

    /// A required external binary is not on `PATH`.
    #[error("Required binary '{binary}' is not installed")]
    MissingDependency { binary: String },

    #[error("Segment ledger error: {message}")]
    Ledger { message: String },

    /// Final concatenation failed; segments are kept for manual recovery.
    #[error("Merge failed: {message}")]
    Merge { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using WinrecError.
pub type WinrecResult<T> = Result<T, WinrecError>;

impl WinrecError {
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch {
            message: msg.into(),
        }
    }

    pub fn missing_dependency(binary: impl Into<String>) -> Self {
        Self::MissingDependency {
            binary: binary.into(),
        }
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger {
            message: msg.into(),
        }
    }

    pub fn merge(msg: impl Into<String>) -> Self {
        Self::Merge {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
