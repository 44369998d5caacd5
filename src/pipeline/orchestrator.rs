//! Batch orchestrator for the task × condition matrix.
//!
//! Runs task-major, then condition-major, then row-major, strictly in
//! sequence. The inference engine is loaded once per run and the same handle
//! is reused for every pair. A task's dataset is loaded (and limited) once
//! and shared by all of its conditions.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::config::HarnessConfig;
use super::executor::RowExecutor;
use super::progress::ProgressCounters;
use super::stages::TwoStagePipeline;
use crate::dataset::{DatasetLoader, Row};
use crate::error::HarnessError;
use crate::llm::{EngineLoader, InferenceEngine, MeteredEngine};
use crate::registry::{Condition, Registry, TaskSpec};
use crate::storage::{ArtifactKey, ResultFile, ResultWriter};

/// What happened to one (task, condition) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// Rows were run and the artifact written.
    Written,
    /// An artifact already existed and skip-existing was set.
    Skipped,
}

impl std::fmt::Display for PairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PairStatus::Written => write!(f, "written"),
            PairStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Summary line for one (task, condition) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSummary {
    pub task: String,
    pub condition: Condition,
    pub status: PairStatus,
    /// Rows run (0 when skipped).
    pub rows: usize,
    /// Rows that ended in an error record.
    pub errors: usize,
    pub artifact: PathBuf,
    pub duration_secs: f64,
}

/// Summary of a whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub pairs: Vec<PairSummary>,
    pub rows_completed: usize,
    pub rows_failed: usize,
    pub inference_calls: usize,
    pub pairs_written: usize,
    pub pairs_skipped: usize,
}

/// Drives the full evaluation matrix against one inference engine.
pub struct BatchOrchestrator {
    config: HarnessConfig,
    registry: Registry,
    loader: Box<dyn EngineLoader>,
    datasets: DatasetLoader,
    writer: ResultWriter,
}

impl BatchOrchestrator {
    pub fn new(
        config: HarnessConfig,
        registry: Registry,
        loader: impl EngineLoader + 'static,
    ) -> Self {
        let datasets = DatasetLoader::new(&config.data_dir);
        let writer = ResultWriter::new(&config.output_dir);
        Self {
            config,
            registry,
            loader: Box::new(loader),
            datasets,
            writer,
        }
    }

    /// Run every selected (task, condition) pair.
    ///
    /// Row failures are recorded in the artifacts and never stop the run.
    /// A missing or invalid dataset, a failed artifact write, or a failed
    /// engine load stop the run with an error.
    pub async fn run(&self) -> Result<RunSummary, HarnessError> {
        let run_id = format!("run-{}", Uuid::new_v4());
        let span = info_span!("run", run_id = %run_id, model = %self.config.model);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: String) -> Result<RunSummary, HarnessError> {
        let started_at = Utc::now();

        // Selection errors surface before the model is loaded.
        let tasks = self.registry.select_tasks(self.config.tasks.as_deref())?;
        let conditions = self
            .registry
            .select_conditions(self.config.conditions.as_deref())?;

        let counters = ProgressCounters::new();

        info!(model = %self.config.model, "Loading inference engine");
        let load_start = Instant::now();
        let loaded = self.loader.load(&self.config.model).await?;
        info!(
            elapsed_secs = load_start.elapsed().as_secs_f64(),
            "Inference engine loaded"
        );
        let mut engine = MeteredEngine::new(loaded, counters.inference_calls());

        let mut pairs = Vec::with_capacity(tasks.len() * conditions.len());

        for task in tasks {
            info!(task = %task.id, "=== Task ===");
            let rows = self
                .datasets
                .load_limited(&task.id, self.config.limit)
                .await?;

            for &condition in &conditions {
                let summary = self
                    .run_pair(&mut engine, task, condition, &rows, &counters)
                    .await?;
                pairs.push(summary);
            }
        }

        let snap = counters.snapshot();
        let summary = RunSummary {
            run_id,
            model: self.config.model.clone(),
            started_at,
            completed_at: Utc::now(),
            pairs,
            rows_completed: snap.rows_completed,
            rows_failed: snap.rows_failed,
            inference_calls: snap.inference_calls,
            pairs_written: snap.pairs_written,
            pairs_skipped: snap.pairs_skipped,
        };

        info!(
            pairs_written = summary.pairs_written,
            pairs_skipped = summary.pairs_skipped,
            rows_completed = summary.rows_completed,
            rows_failed = summary.rows_failed,
            inference_calls = summary.inference_calls,
            "Run finished"
        );

        Ok(summary)
    }

    async fn run_pair(
        &self,
        engine: &mut dyn InferenceEngine,
        task: &TaskSpec,
        condition: Condition,
        rows: &[Row],
        counters: &ProgressCounters,
    ) -> Result<PairSummary, HarnessError> {
        let key = ArtifactKey::new(&task.id, condition, &self.config.model);
        let artifact = self.writer.path_for(&key);

        if self.config.skip_existing && self.writer.exists(&key).await {
            info!(
                task = %task.id,
                condition = %condition,
                artifact = %artifact.display(),
                "Skipping condition, artifact exists"
            );
            counters.record_skipped();
            return Ok(PairSummary {
                task: task.id.clone(),
                condition,
                status: PairStatus::Skipped,
                rows: 0,
                errors: 0,
                artifact,
                duration_secs: 0.0,
            });
        }

        info!(task = %task.id, condition = %condition, rows = rows.len(), "--- Condition ---");
        let start = Instant::now();

        let pipeline = TwoStagePipeline::new(task, condition, self.registry.relabel_template());
        let executor = RowExecutor::new(pipeline, counters.clone());
        let results = executor
            .execute_all(engine, rows, self.config.progress_interval)
            .await;

        let file = ResultFile::new(&self.config.model, results);
        let errors = file.error_count();
        let path = self.writer.write(&key, &file).await?;
        counters.record_written();

        info!(
            task = %task.id,
            condition = %condition,
            rows = file.results.len(),
            errors,
            artifact = %path.display(),
            "Wrote artifact"
        );

        Ok(PairSummary {
            task: task.id.clone(),
            condition,
            status: PairStatus::Written,
            rows: file.results.len(),
            errors,
            artifact: path,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}
