//! Result artifact storage.
//!
//! One JSON artifact is written per (task, condition, model) key. Each holds
//! the model identity and one [`ResultRecord`] per dataset row, in row order,
//! so downstream scoring can join results with ground truth by position.
//!
//! An existing artifact is treated as proof that its (task, condition) pair
//! completed; resumption works at that granularity only.

pub mod artifacts;
pub mod record;

pub use artifacts::{model_tag, ArtifactKey, ResultWriter};
pub use record::{ResultFile, ResultRecord};
