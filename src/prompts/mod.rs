//! Prompt construction for evaluation tasks.
//!
//! - [`build_prompt`] renders a task template for one row under a condition
//! - [`build_relabel_prompt`] renders the identifier-renaming prompt used by
//!   the first stage of the `code+relabel` pipeline
//!
//! Only the required placeholder is substituted; anything else in a template
//! is passed through as written.

pub mod templates;

use crate::dataset::Row;
use crate::registry::{Condition, TaskSpec, CODE_PLACEHOLDER, MOLECULE_PLACEHOLDER};

/// Render the task prompt for `row` under `condition`.
///
/// `smiles` substitutes the row's SMILES string; `code` and `code+relabel`
/// substitute the row's code. For `code+relabel` the pipeline passes a row
/// whose code has already been replaced by the relabeled text.
pub fn build_prompt(task: &TaskSpec, condition: Condition, row: &Row) -> String {
    let molecule = match condition {
        Condition::Smiles => row.smiles.as_str(),
        Condition::Code | Condition::CodeRelabel => row.code.as_str(),
    };
    task.template.replace(MOLECULE_PLACEHOLDER, molecule)
}

/// Render the relabel-stage prompt for a piece of molecule code.
pub fn build_relabel_prompt(template: &str, code: &str) -> String {
    template.replace(CODE_PLACEHOLDER, code)
}
