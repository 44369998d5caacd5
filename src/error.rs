//! Error types for smiles-eval operations.
//!
//! Defines error types for each subsystem of the harness:
//! - Dataset loading and row schema validation
//! - Inference engine loading and generation calls
//! - Result artifact persistence
//! - Task/condition registry configuration
//!
//! Row-level inference failures are recorded in the output artifact and never
//! abort a run. Every other kind is fatal and propagates out of the
//! orchestrator through [`HarnessError`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a task dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset for task '{task}' not found at {}", path.display())]
    NotFound { task: String, path: PathBuf },

    #[error("Invalid row {index} in dataset for task '{task}': {message}")]
    InvalidRow {
        task: String,
        index: usize,
        message: String,
    },

    #[error("Dataset for task '{task}' is not a JSON array: {message}")]
    Malformed { task: String, message: String },

    #[error("Failed to read dataset for task '{task}' at {}: {source}", path.display())]
    Read {
        task: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by an inference engine.
///
/// Whether raised by the relabel stage or the answer stage, a generation
/// failure is reported the same way in the result artifact.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to load model '{model}': {message}")]
    Load { model: String, message: String },

    #[error("Missing API base URL: LITELLM_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Failed to parse engine response: {0}")]
    Parse(String),

    #[error("Engine returned no content")]
    EmptyResponse,
}

/// Errors that can occur while reading or writing result artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to write artifact {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors in the task/condition registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Unknown condition '{0}': expected one of smiles, code, code+relabel")]
    UnknownCondition(String),

    #[error("Template for '{name}' is missing the {placeholder} placeholder")]
    MissingPlaceholder { name: String, placeholder: String },

    #[error("Task '{0}' is registered more than once")]
    DuplicateTask(String),

    #[error("Invalid task id '{0}': must be non-empty and contain only alphanumeric characters, hyphens, and underscores")]
    InvalidTaskId(String),

    #[error("Registry defines no tasks")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Fatal errors that stop a batch run.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Inference engine unavailable: {0}")]
    Engine(#[from] InferenceError),
}
