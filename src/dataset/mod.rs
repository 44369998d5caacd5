//! Labeled dataset loading.
//!
//! Each task reads one JSON array from `<data_dir>/<task>.json`. Every element
//! must carry string `smiles` and `code` fields; any other fields are ground
//! truth for the external scorer and are kept untouched. Rows are validated
//! when the file is loaded, so a malformed row fails the task up front with
//! its index instead of surfacing halfway through a run.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DatasetError;

/// One dataset entry. Position in the dataset is its stable index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// SMILES notation of the molecule.
    pub smiles: String,
    /// Code that constructs the molecule.
    pub code: String,
    /// Task-specific ground truth, consumed only by downstream scoring.
    #[serde(flatten)]
    pub ground_truth: Map<String, Value>,
}

impl Row {
    pub fn new(smiles: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            smiles: smiles.into(),
            code: code.into(),
            ground_truth: Map::new(),
        }
    }

    /// Copy of this row with the code representation replaced.
    pub fn with_code(&self, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..self.clone()
        }
    }
}

/// Reads task datasets from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    data_dir: PathBuf,
}

impl DatasetLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the dataset file backing `task`.
    pub fn path_for(&self, task: &str) -> PathBuf {
        self.data_dir.join(format!("{task}.json"))
    }

    /// Load every row of a task's dataset, in file order.
    pub async fn load(&self, task: &str) -> Result<Vec<Row>, DatasetError> {
        let path = self.path_for(task);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DatasetError::NotFound {
                    task: task.to_string(),
                    path,
                });
            }
            Err(source) => return Err(DatasetError::Read {
                task: task.to_string(),
                path,
                source,
            }),
        };

        let rows = parse_rows(task, &content)?;
        debug!(task = task, rows = rows.len(), path = %path.display(), "Loaded dataset");
        Ok(rows)
    }

    /// Load a task's dataset truncated to at most `limit` rows.
    ///
    /// The orchestrator calls this once per task and reuses the result for
    /// every condition, so all conditions see the same row subset.
    pub async fn load_limited(
        &self,
        task: &str,
        limit: Option<NonZeroUsize>,
    ) -> Result<Vec<Row>, DatasetError> {
        let rows = self.load(task).await?;
        Ok(apply_limit(rows, limit))
    }
}

/// Keep the first `limit` rows; `None` keeps everything.
pub fn apply_limit(mut rows: Vec<Row>, limit: Option<NonZeroUsize>) -> Vec<Row> {
    if let Some(limit) = limit {
        rows.truncate(limit.get());
    }
    rows
}

/// Parse and validate a dataset document.
pub fn parse_rows(task: &str, content: &str) -> Result<Vec<Row>, DatasetError> {
    let document: Value = serde_json::from_str(content).map_err(|e| DatasetError::Malformed {
        task: task.to_string(),
        message: e.to_string(),
    })?;

    let Value::Array(elements) = document else {
        return Err(DatasetError::Malformed {
            task: task.to_string(),
            message: "top-level value must be an array of rows".to_string(),
        });
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_value::<Row>(element).map_err(|e| DatasetError::InvalidRow {
                task: task.to_string(),
                index,
                message: e.to_string(),
            })
        })
        .collect()
}
