//! Merge the ledger of a session that did not shut down cleanly.

use std::path::PathBuf;

use anyhow::Context;
use winrec_capture_engine::{
    finalize_ledger, FfmpegMerger, MergeOutcome, SegmentLedger, SessionLayout,
};
use winrec_common::config::AppConfig;
use winrec_common::error::WinrecError;

pub async fn run(
    config: AppConfig,
    session_dir: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if !session_dir.is_dir() {
        return Err(WinrecError::FileNotFound { path: session_dir }.into());
    }

    let probe_layout = SessionLayout::from_work_dir(
        session_dir.clone(),
        PathBuf::new(),
        &config.recording.container,
    );
    if !probe_layout.ledger_path.exists() {
        return Err(WinrecError::FileNotFound {
            path: probe_layout.ledger_path,
        }
        .into());
    }
    let ledger = SegmentLedger::open(&probe_layout.ledger_path)?;

    // Keep the segments' own container rather than the configured one.
    let container = ledger
        .entries()
        .first()
        .and_then(|e| e.path.extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or(config.recording.container.as_str())
        .to_string();
    let output = match output {
        Some(output) => output,
        None => {
            let stamp = probe_layout
                .stamp()
                .context("Session directory name has no window_recording_ timestamp; pass --output")?;
            config
                .output_dir
                .join(format!("recording_{stamp}.{container}"))
        }
    };
    if output.starts_with(&session_dir) {
        anyhow::bail!("Output must be outside the session directory, which is removed on success");
    }

    let layout = SessionLayout::from_work_dir(session_dir, output, &container);
    println!("Recovering {} ledgered segments from {}", ledger.len(), layout.work_dir.display());

    let merger = FfmpegMerger::new();
    let report = finalize_ledger(&merger, ledger.entries(), &layout).await;

    match report.merge {
        Ok(merge) => {
            for skipped in &merge.skipped {
                println!("Skipped unreadable segment: {}", skipped.display());
            }
            match merge.outcome {
                MergeOutcome::Merged { output, segments } => {
                    println!("Recording saved to: {} ({segments} segments)", output.display());
                }
                MergeOutcome::Empty => println!("No readable segments; nothing written."),
            }
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!(
            "Merge failed; segments kept in {}",
            layout.work_dir.display()
        ))),
    }
}
