//! Batch run configuration.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::registry::Condition;

/// Default model evaluated when none is given.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-7B-Instruct";

/// Default directory holding `<task>.json` datasets.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory receiving result artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "results";

/// Rows between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// Configuration for one batch run over the task × condition matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Directory containing one dataset file per task.
    pub data_dir: PathBuf,
    /// Directory receiving result artifacts.
    pub output_dir: PathBuf,
    /// Model identifier passed to the engine loader.
    pub model: String,
    /// Maximum rows per task; applied once and shared by every condition.
    pub limit: Option<NonZeroUsize>,
    /// Skip (task, condition) pairs whose artifact already exists.
    pub skip_existing: bool,
    /// Tasks to run; `None` runs every registered task.
    pub tasks: Option<Vec<String>>,
    /// Conditions to run; `None` runs every registered condition.
    pub conditions: Option<Vec<Condition>>,
    /// Rows between progress log lines (0 disables them).
    pub progress_interval: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            model: DEFAULT_MODEL.to_string(),
            limit: None,
            skip_existing: false,
            tasks: None,
            conditions: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl HarnessConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the row limit. Zero means no limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = NonZeroUsize::new(limit);
        self
    }

    pub fn with_skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Restricts the run to a single task.
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.tasks = Some(vec![task.into()]);
        self
    }

    /// Restricts the run to a single condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions = Some(vec![condition]);
        self
    }

    pub fn with_progress_interval(mut self, rows: usize) -> Self {
        self.progress_interval = rows;
        self
    }
}
