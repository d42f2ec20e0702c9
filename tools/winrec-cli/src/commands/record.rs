//! Follow a window and record it until SIGINT/SIGTERM.

use std::path::PathBuf;

use anyhow::Context;
use winrec_capture_engine::{
    backend_for, spawn_signal_listener, FfmpegMerger, GeometryWatcher, MergeOutcome,
    ProcessLauncher, RecorderSettings, RecordingSession, SessionLayout, ShutdownCoordinator,
    ShutdownSignal, WatcherConfig,
};
use winrec_common::clock::SessionClock;
use winrec_common::config::{AppConfig, RecorderBackendKind};
use winrec_common::error::WinrecError;
use winrec_platform_linux::permissions::{
    check_capabilities, first_missing_required, print_capability_report,
};
use winrec_platform_linux::{detect_display_server, probe_for};

#[derive(clap::Args, Debug)]
pub struct RecordArgs {
    /// Window title or class to follow (case-insensitive substring)
    #[arg(short, long)]
    pub window: Option<String>,

    /// Geometry poll interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Capture frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Directory for the merged recording
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Recorder backend: auto, wf-recorder, ffmpeg
    #[arg(long)]
    pub backend: Option<RecorderBackendKind>,

    /// How long a recorder may take to finalize after SIGINT
    #[arg(long)]
    pub stop_timeout_ms: Option<u64>,
}

impl RecordArgs {
    fn apply(self, config: &mut AppConfig) {
        let recording = &mut config.recording;
        if let Some(window) = self.window {
            recording.window_name = window;
        }
        if let Some(interval) = self.interval_ms {
            recording.poll_interval_ms = interval;
        }
        if let Some(fps) = self.fps {
            recording.framerate = fps;
        }
        if let Some(backend) = self.backend {
            recording.backend = backend;
        }
        if let Some(timeout) = self.stop_timeout_ms {
            recording.stop_timeout_ms = timeout;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
    }
}

pub async fn run(mut config: AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    args.apply(&mut config);
    let recording = &config.recording;
    recording.validate()?;

    let ds = detect_display_server();
    let backend = backend_for(recording.backend, ds)?;
    let capabilities = check_capabilities(ds, backend.binary());
    if let Some(missing) = first_missing_required(&capabilities) {
        print_capability_report(&capabilities);
        let binary = missing.binary.clone().unwrap_or_else(|| missing.name.clone());
        return Err(WinrecError::missing_dependency(binary).into());
    }
    let probe = probe_for(ds, &recording.window_name)?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let clock = SessionClock::start();
    let layout = SessionLayout::new(
        &config.work_root,
        &config.output_dir,
        &clock,
        &recording.container,
    );
    let signal = ShutdownSignal::new();
    let session = RecordingSession::create(layout, signal.clone(), recording.stop_timeout())?;
    let launcher = ProcessLauncher::new(backend, RecorderSettings::from(recording));
    let listener = spawn_signal_listener(signal.clone())?;

    println!("Recording window: {}", recording.window_name);
    println!("  Started: {}", clock.started_at_rfc3339());
    println!("  Segments: {}", session.layout().work_dir.display());
    println!("  Output: {}", session.layout().output_path.display());
    println!();
    println!("Press Ctrl+C to stop recording...");
    println!();

    let mut watcher = GeometryWatcher::new(
        session,
        probe,
        Box::new(launcher),
        WatcherConfig::from(recording),
    );
    let mut coordinator = ShutdownCoordinator::new(signal, Box::new(FfmpegMerger::new()));

    watcher.run().await;
    let report = coordinator.finish(&mut watcher).await;
    listener.abort();

    println!();
    println!("Recorded for {:.1}s", clock.elapsed_secs());
    let Some(report) = report else {
        return Ok(());
    };

    match &report.merge {
        Ok(merge) => {
            for skipped in &merge.skipped {
                println!("Skipped unreadable segment: {}", skipped.display());
            }
            match &merge.outcome {
                MergeOutcome::Merged { output, segments } => {
                    println!("Recording saved to: {} ({segments} segments)", output.display());
                }
                MergeOutcome::Empty => println!("Window was never recorded; no output written."),
            }
        }
        Err(e) => {
            // Segments are preserved for `winrec recover`.
            println!("Merge failed: {e}");
            println!(
                "Segments kept in {}; retry with `winrec recover {}`",
                watcher.session().layout().work_dir.display(),
                watcher.session().layout().work_dir.display()
            );
        }
    }

    Ok(())
}
