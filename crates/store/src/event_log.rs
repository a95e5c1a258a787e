//! Append-only event journal — newline-delimited JSON on a single path.
//!
//! Each line is a JSON-encoded [`EventLogEntry`]. Appends are serialized by
//! the pipeline's single consumer lane; an internal mutex additionally
//! guards the file so `append` and `rotate` never interleave within the
//! process. Rotation rewrites the file wholesale and is not crash-atomic;
//! the journal is best-effort history.

use betterclaw_core::decision::EventLogEntry;
use betterclaw_core::error::StoreError;
use betterclaw_core::time::epoch_now;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rotation keeps at most this many entries.
pub const MAX_LOG_ENTRIES: usize = 10_000;

/// Rotation drops entries older than this.
pub const MAX_ENTRY_AGE_SECS: f64 = 30.0 * 86_400.0;

/// The append-only journal of triage decisions.
pub struct EventLog {
    path: PathBuf,
    io: Mutex<()>,
}

impl EventLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path, io: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line. Creates the parent directory on
    /// first use.
    pub async fn append(&self, entry: &EventLogEntry) -> Result<(), StoreError> {
        let _io = self.io.lock().await;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let mut line =
            serde_json::to_string(entry).map_err(|e| StoreError::Encode(e.to_string()))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::Write { path: self.path.clone(), reason: e.to_string() })?;
        file.write_all(line.as_bytes())
            .map_err(|e| StoreError::Write { path: self.path.clone(), reason: e.to_string() })?;

        Ok(())
    }

    /// Entries with `timestamp >= since`, oldest first. Blank and corrupt
    /// lines are skipped.
    pub async fn read_since(&self, since: f64) -> Vec<EventLogEntry> {
        let _io = self.io.lock().await;
        Self::read_all(&self.path)
            .into_iter()
            .filter(|e| e.timestamp >= since)
            .collect()
    }

    /// Drop old entries once the journal grows past [`MAX_LOG_ENTRIES`].
    ///
    /// Keeps entries younger than [`MAX_ENTRY_AGE_SECS`], then truncates to
    /// the most recent [`MAX_LOG_ENTRIES`], and rewrites the file. Returns
    /// the number of entries dropped; 0 when under the threshold.
    pub async fn rotate(&self) -> Result<usize, StoreError> {
        self.rotate_at(epoch_now()).await
    }

    async fn rotate_at(&self, now: f64) -> Result<usize, StoreError> {
        let _io = self.io.lock().await;

        let entries = Self::read_all(&self.path);
        if entries.len() <= MAX_LOG_ENTRIES {
            return Ok(0);
        }

        let cutoff = now - MAX_ENTRY_AGE_SECS;
        let mut kept: Vec<EventLogEntry> =
            entries.iter().filter(|e| e.timestamp >= cutoff).cloned().collect();
        if kept.len() > MAX_LOG_ENTRIES {
            kept = kept.split_off(kept.len() - MAX_LOG_ENTRIES);
        }

        let mut content = String::new();
        for entry in &kept {
            let line =
                serde_json::to_string(entry).map_err(|e| StoreError::Encode(e.to_string()))?;
            content.push_str(&line);
            content.push('\n');
        }
        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Write { path: self.path.clone(), reason: e.to_string() })?;

        let dropped = entries.len() - kept.len();
        debug!(dropped, kept = kept.len(), "Event journal rotated");
        Ok(dropped)
    }

    fn read_all(path: &Path) -> Vec<EventLogEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // No journal yet
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<EventLogEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted journal line");
                    None
                }
            })
            .collect()
    }
}
