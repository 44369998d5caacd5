//! Row-level executor: runs each row's pipeline inside a failure boundary.

use tracing::{debug, error, info};

use super::progress::ProgressCounters;
use super::stages::{RowOutcome, TwoStagePipeline};
use crate::dataset::Row;
use crate::error::InferenceError;
use crate::llm::InferenceEngine;
use crate::storage::ResultRecord;

/// Executes rows for one (task, condition) pair.
///
/// A failed row yields an error record and the next row runs as usual; no
/// retry is attempted here.
pub struct RowExecutor<'a> {
    pipeline: TwoStagePipeline<'a>,
    counters: ProgressCounters,
}

impl<'a> RowExecutor<'a> {
    pub fn new(pipeline: TwoStagePipeline<'a>, counters: ProgressCounters) -> Self {
        Self { pipeline, counters }
    }

    /// Run the full pipeline for one row.
    pub async fn process(
        &self,
        engine: &mut dyn InferenceEngine,
        row: &Row,
    ) -> Result<RowOutcome, InferenceError> {
        self.pipeline.run(engine, row).await
    }

    /// Run one row and turn its outcome into a result record.
    pub async fn execute(
        &self,
        engine: &mut dyn InferenceEngine,
        index: usize,
        row: &Row,
    ) -> ResultRecord {
        let outcome = self.process(engine, row).await;

        match &outcome {
            Ok(_) => {
                self.counters.record_completed();
                debug!(
                    task = %self.pipeline.task().id,
                    condition = %self.pipeline.condition(),
                    index,
                    "Row completed"
                );
            }
            Err(e) => {
                self.counters.record_failed();
                error!(
                    task = %self.pipeline.task().id,
                    condition = %self.pipeline.condition(),
                    index,
                    error = %e,
                    "Error on row"
                );
            }
        }

        ResultRecord::from_outcome(index, outcome)
    }

    /// Run every row in order. The returned records are index-aligned with `rows`.
    pub async fn execute_all(
        &self,
        engine: &mut dyn InferenceEngine,
        rows: &[Row],
        progress_interval: usize,
    ) -> Vec<ResultRecord> {
        let total = rows.len();
        let mut records = Vec::with_capacity(total);

        for (index, row) in rows.iter().enumerate() {
            records.push(self.execute(engine, index, row).await);

            let done = index + 1;
            if progress_interval > 0 && done % progress_interval == 0 {
                info!(
                    task = %self.pipeline.task().id,
                    condition = %self.pipeline.condition(),
                    done,
                    total,
                    "Progress"
                );
            }
        }

        records
    }
}
