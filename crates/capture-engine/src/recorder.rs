//! External screen-recorder processes.
//!
//! Each segment is captured by one recorder process bound to a fixed
//! rectangle and output file. Stopping sends `SIGINT` so the recorder can
//! finalize its container, escalating to a kill when the timeout elapses.

use std::fs::File;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use winrec_common::config::{RecorderBackendKind, RecordingDefaults};
use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_core::{DisplayServer, WindowGeometry};

/// How a recorder process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited after the interrupt, within the timeout.
    Graceful,
    /// Ignored the interrupt and was killed; the file may be truncated.
    Forced,
    /// Had already exited before the stop was requested.
    AlreadyExited,
}

impl StopOutcome {
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::Forced)
    }
}

/// A running recorder for one segment.
///
/// Dropping a handle without stopping it must still release the process.
#[async_trait::async_trait]
pub trait RecorderHandle: Send {
    /// OS process id, if the recorder is process-backed and still known.
    fn pid(&self) -> Option<u32>;

    /// Non-blocking check whether the recorder exited on its own.
    fn has_exited(&mut self) -> bool;

    /// Interrupt the recorder and wait up to `timeout` for it to exit,
    /// force-killing it afterwards.
    async fn stop_graceful(&mut self, timeout: Duration) -> WinrecResult<StopOutcome>;
}

/// Starts recorders bound to a geometry and output path.
#[async_trait::async_trait]
pub trait RecorderLauncher: Send {
    async fn start(
        &mut self,
        geometry: WindowGeometry,
        output_path: &Path,
    ) -> WinrecResult<Box<dyn RecorderHandle>>;

    /// Launcher name for logging.
    fn name(&self) -> &str;
}

/// Capture parameters shared by every segment of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    pub framerate: u32,
    pub codec: String,
    pub pixel_format: String,
}

impl From<&RecordingDefaults> for RecorderSettings {
    fn from(defaults: &RecordingDefaults) -> Self {
        Self {
            framerate: defaults.framerate,
            codec: defaults.codec.clone(),
            pixel_format: defaults.pixel_format.clone(),
        }
    }
}

/// Builds the command line of a specific recorder binary.
pub trait RecorderBackend: Send + Sync {
    /// Binary to execute.
    fn binary(&self) -> &str;

    /// Arguments capturing `geometry` into `output_path`.
    fn args(
        &self,
        geometry: WindowGeometry,
        output_path: &Path,
        settings: &RecorderSettings,
    ) -> Vec<String>;
}

/// `wf-recorder` for wlroots-based compositors.
#[derive(Debug, Default)]
pub struct WfRecorderBackend;

impl RecorderBackend for WfRecorderBackend {
    fn binary(&self) -> &str {
        "wf-recorder"
    }

    fn args(
        &self,
        geometry: WindowGeometry,
        output_path: &Path,
        settings: &RecorderSettings,
    ) -> Vec<String> {
        vec![
            "--geometry".to_string(),
            geometry.to_string(),
            "--framerate".to_string(),
            settings.framerate.to_string(),
            "--file".to_string(),
            output_path.to_string_lossy().into_owned(),
            "--codec".to_string(),
            settings.codec.clone(),
            "--pixel-format".to_string(),
            settings.pixel_format.clone(),
        ]
    }
}

/// `ffmpeg -f x11grab` for X11 sessions.
#[derive(Debug)]
pub struct FfmpegX11Backend {
    display: String,
}

impl FfmpegX11Backend {
    pub fn new(display: impl Into<String>) -> Self {
        Self {
            display: display.into(),
        }
    }

    /// Use `$DISPLAY`, falling back to `:0`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string()))
    }
}

impl RecorderBackend for FfmpegX11Backend {
    fn binary(&self) -> &str {
        "ffmpeg"
    }

    fn args(
        &self,
        geometry: WindowGeometry,
        output_path: &Path,
        settings: &RecorderSettings,
    ) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-f".to_string(),
            "x11grab".to_string(),
            "-framerate".to_string(),
            settings.framerate.to_string(),
            "-video_size".to_string(),
            format!("{}x{}", geometry.width, geometry.height),
            "-i".to_string(),
            format!("{}+{},{}", self.display, geometry.x, geometry.y),
            "-c:v".to_string(),
            settings.codec.clone(),
            "-pix_fmt".to_string(),
            settings.pixel_format.clone(),
            output_path.to_string_lossy().into_owned(),
        ]
    }
}

/// Pick the recorder backend for the configured kind and display server.
pub fn backend_for(
    kind: RecorderBackendKind,
    display_server: DisplayServer,
) -> WinrecResult<Box<dyn RecorderBackend>> {
    match (kind, display_server) {
        (RecorderBackendKind::WfRecorder, _) => Ok(Box::new(WfRecorderBackend)),
        (RecorderBackendKind::Ffmpeg, _) => Ok(Box::new(FfmpegX11Backend::from_env())),
        (RecorderBackendKind::Auto, DisplayServer::Hyprland | DisplayServer::Wayland) => {
            Ok(Box::new(WfRecorderBackend))
        }
        (RecorderBackendKind::Auto, DisplayServer::X11) => {
            Ok(Box::new(FfmpegX11Backend::from_env()))
        }
        (RecorderBackendKind::Auto, DisplayServer::Unknown) => Err(WinrecError::platform(
            "Cannot pick a recorder for an unknown display server; pass --backend",
        )),
    }
}

/// Round width and height down to even values for 4:2:0 encoders.
pub fn even_geometry(geometry: WindowGeometry) -> WindowGeometry {
    WindowGeometry {
        width: geometry.width & !1,
        height: geometry.height & !1,
        ..geometry
    }
}

/// Launches recorder processes through a [`RecorderBackend`].
pub struct ProcessLauncher {
    backend: Box<dyn RecorderBackend>,
    settings: RecorderSettings,
    startup_grace: Duration,
}

impl ProcessLauncher {
    pub fn new(backend: Box<dyn RecorderBackend>, settings: RecorderSettings) -> Self {
        Self {
            backend,
            settings,
            startup_grace: Duration::from_millis(200),
        }
    }

    /// How long to watch a fresh recorder for an immediate exit, which is
    /// how recorders reject a geometry. Zero disables the check.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    pub fn binary(&self) -> &str {
        self.backend.binary()
    }
}

#[async_trait::async_trait]
impl RecorderLauncher for ProcessLauncher {
    async fn start(
        &mut self,
        geometry: WindowGeometry,
        output_path: &Path,
    ) -> WinrecResult<Box<dyn RecorderHandle>> {
        let capture = even_geometry(geometry);
        if capture.is_degenerate() {
            return Err(WinrecError::launch(format!(
                "Refusing to record degenerate geometry {geometry}"
            )));
        }

        let binary = self.backend.binary().to_string();
        let args = self.backend.args(capture, output_path, &self.settings);
        let log_path = output_path.with_extension("log");
        let stderr = File::create(&log_path).map(Stdio::from).unwrap_or_else(|e| {
            tracing::debug!(path = %log_path.display(), error = %e, "Recorder log unavailable");
            Stdio::null()
        });

        tracing::debug!(%binary, ?args, "Spawning recorder");
        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WinrecError::launch(format!("Failed to start {binary}: {e}")))?;

        if !self.startup_grace.is_zero() {
            tokio::time::sleep(self.startup_grace).await;
            if let Some(status) = child.try_wait()? {
                return Err(WinrecError::launch(format!(
                    "{binary} exited immediately ({status}) for geometry {capture}; see {}",
                    log_path.display()
                )));
            }
        }

        tracing::info!(
            pid = child.id(),
            %binary,
            geometry = %capture,
            path = %output_path.display(),
            "Recorder process started"
        );

        Ok(Box::new(ProcessRecorder { binary, child }))
    }

    fn name(&self) -> &str {
        self.backend.binary()
    }
}

/// A recorder child process. Killed on drop if still running.
pub struct ProcessRecorder {
    binary: String,
    child: Child,
}

#[async_trait::async_trait]
impl RecorderHandle for ProcessRecorder {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(binary = %self.binary, error = %e, "Failed to poll recorder");
                false
            }
        }
    }

    async fn stop_graceful(&mut self, timeout: Duration) -> WinrecResult<StopOutcome> {
        if self.child.try_wait()?.is_some() {
            return Ok(StopOutcome::AlreadyExited);
        }

        let pid = self.child.id();
        if let Some(pid) = pid {
            // SAFETY: kill(2) has no memory-safety preconditions; the pid is
            // our own unreaped child so it cannot have been recycled.
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
            if rc != 0 {
                tracing::warn!(
                    pid,
                    error = %std::io::Error::last_os_error(),
                    "Failed to interrupt recorder"
                );
            }
        }

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::debug!(?pid, %status, "Recorder exited after interrupt");
                Ok(StopOutcome::Graceful)
            }
            Err(_) => {
                tracing::warn!(
                    ?pid,
                    binary = %self.binary,
                    timeout_ms = timeout.as_millis() as u64,
                    "Recorder ignored interrupt; killing it (segment may be truncated)"
                );
                self.child.start_kill()?;
                self.child.wait().await?;
                Ok(StopOutcome::Forced)
            }
        }
    }
}
