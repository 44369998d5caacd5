//! Command-line interface for smiles-eval.
//!
//! Provides the `run` command driving an evaluation batch and the `list`
//! command showing registered tasks and conditions.

mod commands;

pub use commands::{harness_config, parse_cli, run_with_cli, Cli, Commands, ListArgs, RunArgs};
