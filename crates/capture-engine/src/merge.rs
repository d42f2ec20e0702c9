//! Lossless concatenation of ledgered segments.
//!
//! Segments are verified first; an unreadable segment (typically the last
//! one after a crash or forced stop) is skipped with a warning instead of
//! failing the whole merge.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use winrec_common::error::{WinrecError, WinrecResult};
use winrec_platform_linux::command_exists;

use crate::ledger::LedgerEntry;

/// External concatenation tool.
#[async_trait::async_trait]
pub trait Merger: Send + Sync {
    /// Whether a non-empty segment file can be decoded.
    async fn is_readable(&self, segment: &Path) -> bool;

    /// Stream-copy every file listed in `list_file` into `output`.
    async fn concat(&self, list_file: &Path, output: &Path) -> WinrecResult<()>;
}

/// What the merge step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The final recording was written.
    Merged { output: PathBuf, segments: usize },
    /// Nothing usable was ledgered; no output was written.
    Empty,
}

/// Merge result plus the segments that had to be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub outcome: MergeOutcome,
    pub skipped: Vec<PathBuf>,
}

/// Verify ledgered segments and concatenate the readable ones in order.
pub async fn merge_segments(
    merger: &dyn Merger,
    entries: &[LedgerEntry],
    list_file: &Path,
    output: &Path,
) -> WinrecResult<MergeReport> {
    let mut readable = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for entry in entries {
        let non_empty = std::fs::metadata(&entry.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if non_empty && merger.is_readable(&entry.path).await {
            readable.push(entry.path.clone());
        } else {
            tracing::warn!(
                segment = entry.index,
                path = %entry.path.display(),
                "Segment is unreadable; skipping it (final video will miss this interval)"
            );
            skipped.push(entry.path.clone());
        }
    }

    if readable.is_empty() {
        tracing::info!(
            ledgered = entries.len(),
            "No recorded segments to merge; no output written"
        );
        return Ok(MergeReport {
            outcome: MergeOutcome::Empty,
            skipped,
        });
    }

    std::fs::write(list_file, concat_list(&readable))
        .map_err(|e| WinrecError::merge(format!("Failed to write concat list: {e}")))?;

    tracing::info!(
        segments = readable.len(),
        output = %output.display(),
        "Combining segments"
    );
    merger.concat(list_file, output).await?;

    Ok(MergeReport {
        outcome: MergeOutcome::Merged {
            output: output.to_path_buf(),
            segments: readable.len(),
        },
        skipped,
    })
}

/// Render an ffmpeg concat-demuxer list.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

/// `ffmpeg -f concat -c copy`, verifying segments with `ffprobe` when present.
pub struct FfmpegMerger {
    verify: bool,
}

impl FfmpegMerger {
    pub fn new() -> Self {
        let verify = command_exists("ffprobe");
        if !verify {
            tracing::warn!("ffprobe not found; segments will not be decoded before merging");
        }
        Self { verify }
    }
}

impl Default for FfmpegMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Merger for FfmpegMerger {
    async fn is_readable(&self, segment: &Path) -> bool {
        if !self.verify {
            return true;
        }
        let output = Command::new("ffprobe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(segment)
            .stdin(Stdio::null())
            .output()
            .await;
        match output {
            Ok(out) => {
                out.status.success() && !String::from_utf8_lossy(&out.stdout).trim().is_empty()
            }
            Err(e) => {
                tracing::debug!(error = %e, "ffprobe failed to run; assuming readable");
                true
            }
        }
    }

    async fn concat(&self, list_file: &Path, output: &Path) -> WinrecResult<()> {
        let result = Command::new("ffmpeg")
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list_file)
            .args(["-c", "copy"])
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| WinrecError::merge(format!("Failed to start ffmpeg: {e}")))?;

        if !result.status.success() {
            return Err(WinrecError::merge(format!(
                "ffmpeg concat failed (status {}): {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        if !output.exists() {
            return Err(WinrecError::merge(format!(
                "ffmpeg reported success but {} was not written",
                output.display()
            )));
        }
        Ok(())
    }
}
