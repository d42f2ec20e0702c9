//! Append-only segment ledger for crash-safe merging.
//!
//! `segments.txt` lists one segment file path per line in recording order.
//! Every append is flushed and synced before returning, so a crash leaves a
//! replayable record. A segment is only ledgered after its recorder stopped.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use winrec_common::error::{WinrecError, WinrecResult};

use crate::session::Segment;

/// One ledgered segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub index: u32,
    pub path: PathBuf,
}

/// Durable, ordered record of completed segment files.
pub struct SegmentLedger {
    file: File,
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl SegmentLedger {
    /// Open (or create) the ledger at `path`, replaying existing entries.
    pub fn open(path: impl Into<PathBuf>) -> WinrecResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            parse_entries(&std::fs::read_to_string(&path)?)
        } else {
            Vec::new()
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                WinrecError::ledger(format!("Failed to open ledger {}: {e}", path.display()))
            })?;

        if !entries.is_empty() {
            tracing::info!(
                path = %path.display(),
                entries = entries.len(),
                "Replayed existing segment ledger"
            );
        }

        Ok(Self {
            file,
            path,
            entries,
        })
    }

    /// Append a stopped segment. Re-appending the current last path is a
    /// no-op and returns `false`.
    pub fn append(&mut self, segment: &Segment) -> WinrecResult<bool> {
        if self.entries.last().map(|e| &e.path) == Some(&segment.path) {
            tracing::debug!(segment = segment.index, "Segment already ledgered");
            return Ok(false);
        }

        let line = segment.path.to_string_lossy();
        if line.contains('\n') || line.contains('\r') {
            return Err(WinrecError::ledger(format!(
                "Segment path contains a line break: {line:?}"
            )));
        }

        write_synced_line(&mut self.file, &line)
            .map_err(|e| WinrecError::ledger(format!("Failed to append to ledger: {e}")))?;

        self.entries.push(LedgerEntry {
            index: segment.index,
            path: segment.path.clone(),
        });
        Ok(true)
    }

    /// All ledgered segments in recording order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Highest ledgered segment index, 0 when empty.
    pub fn last_index(&self) -> u32 {
        self.entries.iter().map(|e| e.index).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path to the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_synced_line(file: &mut File, line: &str) -> std::io::Result<()> {
    writeln!(file, "{line}")?;
    file.flush()?;
    file.sync_data()
}

fn parse_entries(content: &str) -> Vec<LedgerEntry> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(position, line)| {
            let path = PathBuf::from(line);
            let index = segment_index_from_path(&path).unwrap_or(position as u32 + 1);
            LedgerEntry { index, path }
        })
        .collect()
}

/// Parse `<n>` out of a `segment_<n>.<ext>` file name.
pub fn segment_index_from_path(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("segment_")?
        .parse()
        .ok()
}
