//! CLI command definitions for smiles-eval.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing::info;

use crate::llm::{GenerationParams, LiteLlmLoader};
use crate::pipeline::config::{DEFAULT_DATA_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_PROGRESS_INTERVAL};
use crate::pipeline::{BatchOrchestrator, HarnessConfig, RunSummary, DEFAULT_MODEL};
use crate::registry::{Condition, Registry};

/// Batch evaluation harness comparing molecule representations on LLM tasks.
#[derive(Parser)]
#[command(name = "smiles-eval")]
#[command(about = "Evaluate LLMs on molecule tasks under SMILES and code representations")]
#[command(version)]
#[command(
    long_about = "smiles-eval runs every task under each input condition (smiles, code, code+relabel) over a labeled dataset and writes one result file per (task, condition, model).\n\nExample usage:\n  smiles-eval run --task aromatic-rings --condition code --limit 5 --skip-existing"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the task × condition matrix against a model.
    Run(RunArgs),

    /// List registered tasks and conditions.
    List(ListArgs),
}

/// Arguments for `smiles-eval run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Task to run (default: every registered task).
    #[arg(short = 't', long)]
    pub task: Option<String>,

    /// Condition to run: smiles, code or code+relabel (default: all).
    #[arg(short = 'c', long)]
    pub condition: Option<Condition>,

    /// Maximum rows per task, shared by every condition.
    #[arg(short = 'n', long)]
    pub limit: Option<NonZeroUsize>,

    /// Model identifier to load.
    #[arg(short = 'm', long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Skip (task, condition) pairs whose result file already exists.
    #[arg(long)]
    pub skip_existing: bool,

    /// Directory containing `<task>.json` datasets.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Directory receiving result files.
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// YAML registry overriding the built-in tasks.
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Maximum new tokens per generation call.
    #[arg(long, default_value_t = GenerationParams::default().max_tokens)]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[arg(long, default_value_t = GenerationParams::default().temperature)]
    pub temperature: f64,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "LITELLM_API_BASE")]
    pub api_base: String,

    /// API key (can also be set via LITELLM_API_KEY env var).
    #[arg(long, env = "LITELLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Retries on HTTP 429 before a call is recorded as failed.
    #[arg(long, default_value_t = 3)]
    pub rate_limit_retries: usize,

    /// Rows between progress log lines (0 disables them).
    #[arg(long, default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: usize,

    /// Print the run summary as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `smiles-eval list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// YAML registry overriding the built-in tasks.
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Output as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_eval_command(args).await,
        Commands::List(args) => run_list_command(args).await,
    }
}

async fn load_registry(path: Option<&PathBuf>) -> anyhow::Result<Registry> {
    match path {
        Some(path) => Registry::from_yaml_file(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load registry {}: {}", path.display(), e)),
        None => Ok(Registry::builtin()),
    }
}

/// Build the harness configuration from `run` arguments.
pub fn harness_config(args: &RunArgs) -> HarnessConfig {
    let mut config = HarnessConfig::new()
        .with_data_dir(&args.data_dir)
        .with_output_dir(&args.output_dir)
        .with_model(&args.model)
        .with_skip_existing(args.skip_existing)
        .with_progress_interval(args.progress_interval);
    config.limit = args.limit;
    if let Some(task) = &args.task {
        config = config.with_task(task);
    }
    if let Some(condition) = args.condition {
        config = config.with_condition(condition);
    }
    config
}

async fn run_eval_command(args: RunArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.registry.as_ref()).await?;

    if let Some(task) = &args.task {
        registry.task(task)?;
    }

    let params = GenerationParams {
        max_tokens: args.max_tokens,
        temperature: args.temperature,
    };
    let loader = LiteLlmLoader::new(&args.api_base, args.api_key.clone())
        .with_params(params)
        .with_rate_limit_retries(args.rate_limit_retries);

    let config = harness_config(&args);
    info!(
        model = %config.model,
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        limit = config.limit.map(|l| l.get()),
        skip_existing = config.skip_existing,
        "Starting evaluation run"
    );

    let orchestrator = BatchOrchestrator::new(config, registry, loader);
    let summary = orchestrator.run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n=== Evaluation Results ({}) ===", summary.model);
    println!("Pairs written:   {}", summary.pairs_written);
    println!("Pairs skipped:   {}", summary.pairs_skipped);
    println!("Rows completed:  {}", summary.rows_completed);
    println!("Rows failed:     {}", summary.rows_failed);
    println!("Inference calls: {}", summary.inference_calls);
    println!();

    for pair in &summary.pairs {
        println!(
            "  {}/{} [{}] rows={} errors={} {:.1}s -> {}",
            pair.task,
            pair.condition,
            pair.status,
            pair.rows,
            pair.errors,
            pair.duration_secs,
            pair.artifact.display(),
        );
    }
}

#[derive(Debug, Serialize)]
struct ListOutput {
    tasks: Vec<String>,
    conditions: Vec<Condition>,
}

async fn run_list_command(args: ListArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.registry.as_ref()).await?;
    let output = ListOutput {
        tasks: registry.tasks().iter().map(|t| t.id.clone()).collect(),
        conditions: registry.conditions().to_vec(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Tasks:");
    for task in &output.tasks {
        println!("  {task}");
    }
    println!("Conditions:");
    for condition in &output.conditions {
        println!("  {condition}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["smiles-eval", "run", "--api-base", "http://localhost:4000"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert!(args.task.is_none());
        assert!(args.condition.is_none());
        assert!(args.limit.is_none());
        assert_eq!(args.model, DEFAULT_MODEL);
        assert!(!args.skip_existing);
        assert_eq!(args.max_tokens, 1024);
        assert_eq!(args.rate_limit_retries, 3);

        let config = harness_config(&args);
        assert!(config.tasks.is_none());
        assert!(config.conditions.is_none());
        assert_eq!(config.output_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_run_selection_flags() {
        let cli = parse(&[
            "smiles-eval",
            "run",
            "--api-base",
            "http://x",
            "--task",
            "hbond",
            "--condition",
            "code+relabel",
            "--limit",
            "5",
            "--skip-existing",
            "--model",
            "meta-llama/Llama-3.1-8B",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = harness_config(&args);
        assert_eq!(config.tasks, Some(vec!["hbond".to_string()]));
        assert_eq!(config.conditions, Some(vec![Condition::CodeRelabel]));
        assert_eq!(config.limit.map(|l| l.get()), Some(5));
        assert!(config.skip_existing);
        assert_eq!(config.model, "meta-llama/Llama-3.1-8B");
    }

    #[test]
    fn test_run_rejects_bad_condition_and_zero_limit() {
        assert!(Cli::try_parse_from([
            "smiles-eval", "run", "--api-base", "http://x", "--condition", "code-relabel"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "smiles-eval", "run", "--api-base", "http://x", "--limit", "0"
        ])
        .is_err());
    }

    #[test]
    fn test_list_parses() {
        let cli = parse(&["smiles-eval", "--log-level", "debug", "list", "-j"]);
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::List(ListArgs { json: true, .. })));
    }
}
