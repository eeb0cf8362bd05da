use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jepa::DeviceConfig;
use tracing_subscriber::EnvFilter;

use probe_eval::pipeline::{self, EvalArgs, SummaryArgs};
use probe_eval::{ConfigOverrides, DataPaths, MainConfig};

#[cfg(not(feature = "wgpu"))]
type EvalBackend = burn::backend::Autodiff<burn::backend::NdArray<f32>>;
#[cfg(feature = "wgpu")]
type EvalBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

const DEFAULT_PROBE_TRAIN: &str = "/scratch/DL24FA/probe_normal/train/";
const DEFAULT_PROBE_NORMAL_VAL: &str = "/scratch/DL24FA/probe_normal/val/";
const DEFAULT_PROBE_WALL_VAL: &str = "/scratch/DL24FA/probe_wall/val/";
const DEFAULT_WEIGHTS: &str = "model_weights.mpk";

/// jepa-probe: evaluate pretrained JEPA representations by location probing.
#[derive(Parser)]
#[command(name = "jepa-probe", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for probing evaluation and dataset inspection.
#[derive(Subcommand)]
enum Command {
    /// Train a location prober on the model's predictions and report validation loss.
    Eval {
        /// Path to an eval config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Device: cpu, gpu or gpu:<n>. Default: gpu if built with an accelerator, else cpu.
        #[arg(long)]
        device: Option<String>,
        /// Batch size for all loaders (default: 32).
        #[arg(long)]
        batch_size: Option<usize>,
        /// Threads used to decode dataset files (default: 4).
        #[arg(long)]
        num_workers: Option<usize>,
        /// Representation dimension of the model (default: 256).
        #[arg(long)]
        repr_dim: Option<usize>,
        /// Action dimension of the model (default: 2).
        #[arg(long)]
        action_dim: Option<usize>,
        /// Path to the model weights (default: model_weights.mpk).
        #[arg(long)]
        weights: Option<PathBuf>,
        /// Directory of the probing training split.
        #[arg(long)]
        probe_train: Option<PathBuf>,
        /// Directory of the normal validation split.
        #[arg(long)]
        probe_normal_val: Option<PathBuf>,
        /// Directory of the wall validation split.
        #[arg(long)]
        probe_wall_val: Option<PathBuf>,
        /// Train for one short epoch and evaluate only a few batches.
        #[arg(long)]
        quick_debug: bool,
    },
    /// Print statistics for one or more split directories.
    Summary {
        /// Split directories containing trajectory Parquet files.
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}

fn default_config() -> MainConfig {
    MainConfig {
        device: DeviceConfig::auto(),
        batch_size: 32,
        num_workers: 4,
        repr_dim: 256,
        action_dim: 2,
        model_weights_path: PathBuf::from(DEFAULT_WEIGHTS),
        data: DataPaths {
            probe_train: PathBuf::from(DEFAULT_PROBE_TRAIN),
            probe_normal_val: PathBuf::from(DEFAULT_PROBE_NORMAL_VAL),
            probe_wall_val: PathBuf::from(DEFAULT_PROBE_WALL_VAL),
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Eval {
            config,
            device,
            batch_size,
            num_workers,
            repr_dim,
            action_dim,
            weights,
            probe_train,
            probe_normal_val,
            probe_wall_val,
            quick_debug,
        } => pipeline::run_eval::<EvalBackend>(
            default_config(),
            EvalArgs {
                config,
                overrides: ConfigOverrides {
                    device,
                    batch_size,
                    num_workers,
                    repr_dim,
                    action_dim,
                    model_weights_path: weights,
                    probe_train,
                    probe_normal_val,
                    probe_wall_val,
                },
                quick_debug,
            },
        ),
        Command::Summary { input, json } => pipeline::run_summary(SummaryArgs { inputs: input, json }),
    }
}
