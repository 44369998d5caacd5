//! Batch evaluation pipeline.
//!
//! # Architecture
//!
//! - **Orchestrator**: walks the task × condition matrix, loads the engine
//!   once, applies the row limit and skip-existing filter, writes artifacts
//! - **Executor**: runs each row inside a failure boundary, turning a failed
//!   row into an error record instead of aborting the pair
//! - **Stages**: the per-row `Relabel → Answer` state machine
//! - **Config**: paths, model, limits and selection for one run
//!
//! # Example
//!
//! ```rust,ignore
//! use smiles_eval::llm::LiteLlmLoader;
//! use smiles_eval::pipeline::{BatchOrchestrator, HarnessConfig};
//! use smiles_eval::registry::{Condition, Registry};
//!
//! let config = HarnessConfig::new()
//!     .with_task("aromatic-rings")
//!     .with_condition(Condition::CodeRelabel)
//!     .with_limit(5)
//!     .with_skip_existing(true);
//!
//! let orchestrator = BatchOrchestrator::new(config, Registry::builtin(), LiteLlmLoader::from_env()?);
//! let summary = orchestrator.run().await?;
//! println!("{} rows failed", summary.rows_failed);
//! ```

pub mod config;
pub mod executor;
pub mod orchestrator;
pub mod progress;
pub mod stages;

pub use config::{HarnessConfig, DEFAULT_MODEL};
pub use executor::RowExecutor;
pub use orchestrator::{BatchOrchestrator, PairStatus, PairSummary, RunSummary};
pub use progress::{ProgressCounters, ProgressSnapshot};
pub use stages::{RowOutcome, Stage, TwoStagePipeline};
