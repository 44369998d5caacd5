//! Progress counters for a batch run.
//!
//! Shared atomic counters updated as rows and pairs finish. The orchestrator
//! reads a snapshot at the end of a run to build its summary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of run progress counters at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    /// Rows whose pipeline completed every stage.
    pub rows_completed: usize,
    /// Rows that ended in an error record.
    pub rows_failed: usize,
    /// Generation calls issued to the engine, failed ones included.
    pub inference_calls: usize,
    /// (task, condition) pairs whose artifact was written.
    pub pairs_written: usize,
    /// (task, condition) pairs skipped because their artifact already existed.
    pub pairs_skipped: usize,
}

/// Shared atomic counters for run progress tracking.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounters {
    rows_completed: Arc<AtomicUsize>,
    rows_failed: Arc<AtomicUsize>,
    inference_calls: Arc<AtomicUsize>,
    pairs_written: Arc<AtomicUsize>,
    pairs_skipped: Arc<AtomicUsize>,
}

impl ProgressCounters {
    /// Create a new set of zeroed progress counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completed(&self) {
        self.rows_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.rows_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.pairs_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.pairs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counter handed to [`crate::llm::MeteredEngine`].
    pub fn inference_calls(&self) -> Arc<AtomicUsize> {
        self.inference_calls.clone()
    }

    /// Take a snapshot of the current counter values.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            rows_completed: self.rows_completed.load(Ordering::Relaxed),
            rows_failed: self.rows_failed.load(Ordering::Relaxed),
            inference_calls: self.inference_calls.load(Ordering::Relaxed),
            pairs_written: self.pairs_written.load(Ordering::Relaxed),
            pairs_skipped: self.pairs_skipped.load(Ordering::Relaxed),
        }
    }
}
