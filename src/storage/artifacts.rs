//! Filesystem storage for result artifacts.
//!
//! Artifacts live flat in the output directory as
//! `<task>_<condition>_<model-tag>.json`. Writes go through a temporary file
//! in the same directory and are renamed into place, so a crash mid-write
//! never leaves a truncated artifact behind for skip-existing to trust.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::record::ResultFile;
use crate::error::ArtifactError;
use crate::registry::Condition;

/// Short, filesystem-safe tag for a model identifier.
///
/// Uses the last `/`-separated segment, lowercased:
/// `Qwen/Qwen2.5-7B-Instruct` becomes `qwen2.5-7b-instruct`.
pub fn model_tag(model_id: &str) -> String {
    model_id
        .rsplit('/')
        .next()
        .unwrap_or(model_id)
        .to_lowercase()
}

/// Identity of one result artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub task: String,
    pub condition: Condition,
    pub model_tag: String,
}

impl ArtifactKey {
    pub fn new(task: impl Into<String>, condition: Condition, model_id: &str) -> Self {
        Self {
            task: task.into(),
            condition,
            model_tag: model_tag(model_id),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.task,
            self.condition.file_stem(),
            self.model_tag
        )
    }
}

/// Reads and writes result artifacts under an output directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.output_dir.join(key.file_name())
    }

    /// Whether an artifact for `key` is already on disk.
    pub async fn exists(&self, key: &ArtifactKey) -> bool {
        fs::metadata(self.path_for(key))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Persist `file` for `key`, replacing any previous artifact.
    pub async fn write(&self, key: &ArtifactKey, file: &ResultFile) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(key);
        let mut json = serde_json::to_string_pretty(file)?;
        json.push('\n');

        let write_err = |source: std::io::Error| ArtifactError::Write {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.output_dir).await.map_err(write_err)?;

        let tmp_path = self
            .output_dir
            .join(format!(".{}.{}.tmp", key.file_name(), Uuid::new_v4().simple()));

        if let Err(e) = write_synced(&tmp_path, json.as_bytes()).await {
            discard_temp(&tmp_path).await;
            return Err(write_err(e));
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            discard_temp(&tmp_path).await;
            return Err(write_err(e));
        }

        debug!(path = %path.display(), rows = file.results.len(), "Wrote artifact");
        Ok(path)
    }

    /// Load the artifact for `key`.
    pub async fn read(&self, key: &ArtifactKey) -> Result<ResultFile, ArtifactError> {
        let path = self.path_for(key);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|source| ArtifactError::Read {
                path: path.clone(),
                source,
            })?;
        Ok(serde_json::from_str(&content)?)
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}

async fn discard_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary artifact");
        }
    }
}
