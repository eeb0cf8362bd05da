//! Subcommand implementations for the `jepa-probe` binary.

use std::path::PathBuf;

use burn::tensor::backend::AutodiffBackend;
use jepa::ResolveDevice;
use trajectory::{DatasetSummary, TrajectoryReader};

use crate::adapters::{CheckpointModelLoader, ProbingEvaluatorFactory, WallLoaderFactory};
use crate::config::{build_main_config, load_eval_toml, ConfigOverrides, MainConfig};
use crate::driver::evaluate_model;

/// Arguments for the `eval` subcommand.
#[derive(Debug)]
pub struct EvalArgs {
    /// Optional TOML config layered over the defaults.
    pub config: Option<PathBuf>,
    /// CLI overrides, applied last.
    pub overrides: ConfigOverrides,
    /// One short epoch and three batches per split.
    pub quick_debug: bool,
}

/// Arguments for the `summary` subcommand.
#[derive(Debug)]
pub struct SummaryArgs {
    /// Split directories to summarize.
    pub inputs: Vec<PathBuf>,
    /// Output as JSON instead of human-readable text.
    pub json: bool,
}

/// Resolve the config, train a prober on the model's predictions, and print
/// the per-split losses to stdout.
pub fn run_eval<B: AutodiffBackend + ResolveDevice>(defaults: MainConfig, args: EvalArgs) -> anyhow::Result<()> {
    let toml = args.config.as_deref().map(load_eval_toml).transpose()?;
    let config = build_main_config(defaults, toml.as_ref(), &args.overrides)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    evaluate_model(
        &config,
        &WallLoaderFactory::<B>::default(),
        &CheckpointModelLoader::<B>::default(),
        &ProbingEvaluatorFactory::<B>::default(),
        args.quick_debug,
        &mut out,
    )?;
    Ok(())
}

/// Print statistics for each split directory.
pub fn run_summary(args: SummaryArgs) -> anyhow::Result<()> {
    let mut summaries: Vec<(String, DatasetSummary)> = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        summaries.push((input.display().to_string(), TrajectoryReader::read_summary(input)?));
    }

    if args.json {
        let map: serde_json::Map<String, serde_json::Value> = summaries
            .into_iter()
            .map(|(path, summary)| Ok((path, serde_json::to_value(summary)?)))
            .collect::<anyhow::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    for (path, summary) in &summaries {
        println!("--- Dataset Summary ---");
        println!("Directory: {path}");
        println!("Files: {}", summary.files);
        println!("Episodes: {}", summary.episodes);
        println!("Total frames: {}", summary.total_frames);
        println!("Steps per episode: {}..={}", summary.min_steps, summary.max_steps);
        println!("With locations: {}", summary.with_locations);
        println!("Frame shapes: {}", summary.frame_shapes.join(", "));
    }
    Ok(())
}
