//! smiles-eval: batch evaluation harness for molecule representations.
//!
//! Runs every registered task under each input-representation condition
//! (`smiles`, `code`, `code+relabel`) over a labeled dataset, issuing one or
//! two generation calls per row, and persists one resumable result artifact
//! per (task, condition, model).

pub mod cli;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod storage;

// Re-export commonly used error types
pub use error::{ArtifactError, DatasetError, HarnessError, InferenceError, RegistryError};
