//! Per-row two-stage pipeline.
//!
//! A row moves through the states below. `Relabel` is entered only under
//! `code+relabel`; every other condition starts at `Answer`.
//!
//! ```text
//! Relabel ──(relabeled text)──▶ Answer ──(raw response)──▶ Done
//! ```
//!
//! The `Relabel → Answer` transition is unconditional: empty or degenerate
//! relabel output still feeds the answer stage. The relabel output is
//! captured verbatim and never checked against its rename-only contract.

use std::fmt;

use tracing::trace;

use crate::dataset::Row;
use crate::error::InferenceError;
use crate::llm::InferenceEngine;
use crate::prompts::{build_prompt, build_relabel_prompt};
use crate::registry::{Condition, TaskSpec};

/// Stage a row is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Relabel,
    Answer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Relabel => write!(f, "relabel"),
            Stage::Answer => write!(f, "answer"),
        }
    }
}

/// Terminal output of a row that completed every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    /// Raw answer-stage output.
    pub raw_response: String,
    /// Raw relabel-stage output, when that stage ran.
    pub relabeled: Option<String>,
}

enum PipelineState {
    Relabel,
    Answer { relabeled: Option<String> },
    Done(RowOutcome),
}

/// Stage sequence for one (task, condition) pair.
#[derive(Debug, Clone, Copy)]
pub struct TwoStagePipeline<'a> {
    task: &'a TaskSpec,
    condition: Condition,
    relabel_template: &'a str,
}

impl<'a> TwoStagePipeline<'a> {
    pub fn new(task: &'a TaskSpec, condition: Condition, relabel_template: &'a str) -> Self {
        Self {
            task,
            condition,
            relabel_template,
        }
    }

    pub fn task(&self) -> &TaskSpec {
        self.task
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// Stages a row passes through, in order.
    pub fn stages(&self) -> &'static [Stage] {
        if self.condition.needs_relabel() {
            &[Stage::Relabel, Stage::Answer]
        } else {
            &[Stage::Answer]
        }
    }

    /// Drive one row to completion. Any generation failure ends the row.
    pub async fn run(
        &self,
        engine: &mut dyn InferenceEngine,
        row: &Row,
    ) -> Result<RowOutcome, InferenceError> {
        let mut state = if self.condition.needs_relabel() {
            PipelineState::Relabel
        } else {
            PipelineState::Answer { relabeled: None }
        };

        loop {
            state = match state {
                PipelineState::Relabel => {
                    let prompt = build_relabel_prompt(self.relabel_template, &row.code);
                    trace!(stage = %Stage::Relabel, chars = prompt.len(), "Generating");
                    let relabeled = engine.generate(&prompt).await?;
                    PipelineState::Answer {
                        relabeled: Some(relabeled),
                    }
                }
                PipelineState::Answer { relabeled } => {
                    let prompt = match &relabeled {
                        Some(code) => build_prompt(self.task, self.condition, &row.with_code(code.as_str())),
                        None => build_prompt(self.task, self.condition, row),
                    };
                    trace!(stage = %Stage::Answer, chars = prompt.len(), "Generating");
                    let raw_response = engine.generate(&prompt).await?;
                    PipelineState::Done(RowOutcome {
                        raw_response,
                        relabeled,
                    })
                }
                PipelineState::Done(outcome) => return Ok(outcome),
            };
        }
    }
}
