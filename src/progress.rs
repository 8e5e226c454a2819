//! Progress/ETA tracking and the status reporting sink.
//!
//! The tracker is the single writer of progress state for a run. Each update
//! computes elapsed time and an extrapolated ETA, then emits the full state
//! through a [`StatusSink`]. The file sink uses temp-file-then-rename so the
//! external poller never observes a half-written record.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::warn;

use crate::util::now_ms;

#[derive(Debug, Clone, Serialize)]
pub struct ProgressState {
    pub message: String,
    pub progress: Option<f64>,
    pub elapsed_seconds: f64,
    pub eta_seconds: Option<f64>,
    pub complete: bool,
    pub error: bool,
    pub timestamp_ms: i64,
    pub pid: u32,
}

/// Receives every progress update. Implementations must not block the run
/// on failure: a broken status file should never kill a long oracle run.
pub trait StatusSink: Send + Sync {
    fn write(&self, state: &ProgressState);
}

/// Atomic write-and-rename of the status record to a well-known path,
/// polled by an external observer.
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusSink for StatusFile {
    fn write(&self, state: &ProgressState) {
        let payload = match serde_json::to_vec(state) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "status serialize failed");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        // Single writer, so a fixed temp name is safe.
        let tmp = self.path.with_extension("tmp");
        if let Err(e) = std::fs::write(&tmp, &payload) {
            warn!(error = %e, path = %tmp.display(), "status write failed");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            warn!(error = %e, path = %self.path.display(), "status rename failed");
            let _ = std::fs::remove_file(&tmp);
        }
    }
}

/// Discards all updates. Tests and library callers use this.
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn write(&self, _state: &ProgressState) {}
}

/// Extrapolated remaining seconds: `elapsed / (pct/100) - elapsed`.
/// Undefined until some progress exists.
pub fn eta_seconds(elapsed: f64, progress: Option<f64>) -> Option<f64> {
    let pct = progress?;
    if pct <= 0.0 {
        return None;
    }
    Some(elapsed / (pct / 100.0) - elapsed)
}

/// Per-batch percentage within an item type's progress range.
///
/// The first pass (most batches, most real work) sweeps nearly the whole
/// range; each later pass is compressed by `1/iteration` into a shrinking
/// tail so the bar never appears to restart.
pub fn weighted_batch_pct(
    range: (f64, f64),
    iteration: u32,
    batch_index: usize,
    total_batches: usize,
) -> f64 {
    let (start, end) = range;
    let iter_weight = 1.0 / iteration.max(1) as f64;
    let batch_fraction = (batch_index + 1) as f64 / total_batches.max(1) as f64;
    start + batch_fraction * (end - start) * iter_weight
}

pub struct ProgressTracker {
    started: Instant,
    sink: Box<dyn StatusSink>,
}

impl ProgressTracker {
    pub fn new(sink: Box<dyn StatusSink>) -> Self {
        Self {
            started: Instant::now(),
            sink,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// One unit of work done: report message and percentage, derive the rest.
    pub fn update(&self, message: &str, progress: Option<f64>) {
        self.emit(message, progress, false, false);
    }

    pub fn complete(&self, message: &str) {
        self.emit(message, Some(100.0), true, false);
    }

    pub fn fail(&self, message: &str) {
        self.emit(message, None, false, true);
    }

    fn emit(&self, message: &str, progress: Option<f64>, complete: bool, error: bool) {
        let elapsed = self.elapsed_seconds();
        let eta = if complete {
            Some(0.0)
        } else {
            eta_seconds(elapsed, progress)
        };
        let state = ProgressState {
            message: message.to_string(),
            progress,
            elapsed_seconds: elapsed,
            eta_seconds: eta,
            complete,
            error,
            timestamp_ms: now_ms(),
            pid: std::process::id(),
        };
        self.sink.write(&state);
    }
}
