//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the final merged recording is written to.
    pub output_dir: PathBuf,

    /// Parent of the per-session temporary working directory.
    pub work_root: PathBuf,

    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default recording parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Case-insensitive substring matched against window title/class.
    pub window_name: String,

    /// Delay between geometry polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Capture frame rate passed to the recorder.
    pub framerate: u32,

    /// Video codec passed to the recorder.
    pub codec: String,

    /// Pixel format passed to the recorder.
    pub pixel_format: String,

    /// Container extension for segments and the final output.
    pub container: String,

    /// How long a graceful recorder stop may take before it is killed.
    pub stop_timeout_ms: u64,

    /// Which external recorder to drive.
    pub backend: RecorderBackendKind,
}

/// External recorder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecorderBackendKind {
    /// Pick from the detected display server.
    #[default]
    Auto,
    /// `wf-recorder` (wlroots compositors).
    WfRecorder,
    /// `ffmpeg -f x11grab`.
    Ffmpeg,
}

impl std::str::FromStr for RecorderBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "wf-recorder" | "wf" | "wayland" => Ok(Self::WfRecorder),
            "ffmpeg" | "x11" | "x11grab" => Ok(Self::Ffmpeg),
            _ => Err(format!(
                "Unknown recorder backend '{s}'. Use: auto, wf-recorder, ffmpeg"
            )),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "winrec=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            work_root: std::env::temp_dir(),
            recording: RecordingDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            window_name: "scrcpy".to_string(),
            poll_interval_ms: 500,
            framerate: 30,
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            container: "mp4".to_string(),
            stop_timeout_ms: 5_000,
            backend: RecorderBackendKind::Auto,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl RecordingDefaults {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Reject settings the watcher cannot run with.
    pub fn validate(&self) -> Result<(), crate::error::WinrecError> {
        if self.window_name.trim().is_empty() {
            return Err(crate::error::WinrecError::config(
                "window name must not be empty",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(crate::error::WinrecError::config(
                "poll interval must be greater than zero",
            ));
        }
        if self.framerate == 0 {
            return Err(crate::error::WinrecError::config(
                "framerate must be greater than zero",
            ));
        }
        if self.container.trim().is_empty() || self.container.contains('/') {
            return Err(crate::error::WinrecError::config(format!(
                "invalid container extension '{}'",
                self.container
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("winrec").join("config.json")
}
