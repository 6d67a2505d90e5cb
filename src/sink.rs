use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ::time::OffsetDateTime;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::error;

use crate::types::ScanResult;

/// File name of the append-only result log inside the output directory.
pub const RESULTS_FILE: &str = "results.jsonl";

/// Running totals for one scan session.
///
/// `total == errors + status_codes.values().sum()` holds after every
/// [`ScanStats::record`].
#[derive(Debug, Clone)]
pub struct ScanStats {
    pub total: u64,
    pub errors: u64,
    pub redirects: u64,
    pub status_codes: BTreeMap<String, u64>,
    pub started_at: OffsetDateTime,
    started: Instant,
}

impl ScanStats {
    pub fn new() -> Self {
        Self {
            total: 0,
            errors: 0,
            redirects: 0,
            status_codes: BTreeMap::new(),
            started_at: OffsetDateTime::now_utc(),
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, result: &ScanResult) {
        self.total += 1;
        if result.is_failure() {
            self.errors += 1;
            return;
        }
        self.redirects += result.redirects.len() as u64;
        *self
            .status_codes
            .entry(result.status.to_string())
            .or_insert(0) += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

struct SinkState {
    stats: ScanStats,
    file: Option<File>,
}

/// Shared by every scan task: updates stats and appends one JSONL line per
/// result inside a single critical section.
pub struct ResultSink {
    state: Mutex<SinkState>,
    path: Option<PathBuf>,
}

impl ResultSink {
    /// Open (or create) `<dir>/results.jsonl` for appending. The directory must exist.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(RESULTS_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open results file: {}", path.display()))?;
        Ok(Self {
            state: Mutex::new(SinkState {
                stats: ScanStats::new(),
                file: Some(file),
            }),
            path: Some(path),
        })
    }

    /// Stats-only sink that persists nothing.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(SinkState {
                stats: ScanStats::new(),
                file: None,
            }),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Count and persist one result. Returns its 1-based completion ordinal.
    ///
    /// A failed append is logged and does not undo the stats update.
    pub async fn record(&self, result: &ScanResult) -> u64 {
        let mut state = self.state.lock().await;
        state.stats.record(result);
        let ordinal = state.stats.total;

        if let Some(file) = state.file.as_mut() {
            if let Err(e) = append_line(file, result).await {
                error!(url = %result.url, "failed to append result: {e:#}");
            }
        }
        ordinal
    }

    pub async fn snapshot(&self) -> ScanStats {
        self.state.lock().await.stats.clone()
    }
}

async fn append_line(file: &mut File, result: &ScanResult) -> Result<()> {
    let mut line = serde_json::to_vec(result)?;
    line.push(b'\n');
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}
