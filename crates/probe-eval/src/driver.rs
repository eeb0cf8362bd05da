//! Evaluation driver: load data, load the model, train and score a prober.
//!
//! The collaborators are traits so the driver can run against the burn
//! adapters in [`crate::adapters`] or the stubs in [`crate::mocks`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use jepa::{DeviceConfig, ProbingConfig};

use crate::config::MainConfig;

/// Validation split names, in report order.
pub const NORMAL_SPLIT: &str = "normal";
pub const WALL_SPLIT: &str = "wall";

/// Arguments for one data loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderRequest {
    pub data_path: PathBuf,
    pub probing: bool,
    pub device: DeviceConfig,
    pub batch_size: usize,
    pub num_workers: usize,
    pub train: bool,
    pub augment: bool,
}

/// Builds a batch loader for one split directory.
pub trait DataLoaderFactory {
    type Loader;

    fn create(&self, request: &LoaderRequest) -> anyhow::Result<Self::Loader>;
}

/// Produces a pretrained model in evaluation mode.
pub trait ModelLoader {
    type Model;

    fn load(&self, config: &MainConfig) -> anyhow::Result<Self::Model>;
}

/// Trains a prober and scores it on the validation splits.
pub trait ProbeEvaluator {
    type Prober;

    fn train_pred_prober(&mut self) -> anyhow::Result<Self::Prober>;

    fn evaluate_all(&self, prober: &Self::Prober) -> anyhow::Result<BTreeMap<String, f64>>;
}

/// Constructs a [`ProbeEvaluator`] from loaded collaborators.
pub trait EvaluatorFactory<L, M> {
    type Evaluator: ProbeEvaluator;

    fn build(
        &self,
        device: DeviceConfig,
        model: M,
        train: L,
        val: BTreeMap<String, L>,
        config: ProbingConfig,
        quick_debug: bool,
    ) -> anyhow::Result<Self::Evaluator>;
}

/// Create the probing training loader and the `normal`/`wall` validation
/// loaders.
///
/// Only the training loader sets `train`; none augment. Errors from the
/// factory propagate unchanged.
pub fn load_data<F: DataLoaderFactory>(
    config: &MainConfig,
    factory: &F,
) -> anyhow::Result<(F::Loader, BTreeMap<String, F::Loader>)> {
    let request = |data_path: &PathBuf, train: bool| LoaderRequest {
        data_path: data_path.clone(),
        probing: true,
        device: config.device,
        batch_size: config.batch_size,
        num_workers: config.num_workers,
        train,
        augment: false,
    };

    let train = factory.create(&request(&config.data.probe_train, true))?;
    let normal = factory.create(&request(&config.data.probe_normal_val, false))?;
    let wall = factory.create(&request(&config.data.probe_wall_val, false))?;

    let mut val = BTreeMap::new();
    val.insert(NORMAL_SPLIT.to_string(), normal);
    val.insert(WALL_SPLIT.to_string(), wall);
    Ok((train, val))
}

/// One report line per split: `Average evaluation loss on <name> dataset: <loss>`.
pub fn format_report(losses: &BTreeMap<String, f64>) -> String {
    losses
        .iter()
        .map(|(name, loss)| format!("Average evaluation loss on {name} dataset: {loss:.4}\n"))
        .collect()
}

/// Run a full probing evaluation and write the report to `out`.
///
/// Returns the per-split losses that were reported.
pub fn evaluate_model<F, ML, EF>(
    config: &MainConfig,
    loaders: &F,
    models: &ML,
    evaluators: &EF,
    quick_debug: bool,
    out: &mut impl Write,
) -> anyhow::Result<BTreeMap<String, f64>>
where
    F: DataLoaderFactory,
    ML: ModelLoader,
    EF: EvaluatorFactory<F::Loader, ML::Model>,
{
    tracing::info!(
        device = %config.device,
        batch_size = config.batch_size,
        num_workers = config.num_workers,
        weights = %config.model_weights_path.display(),
        "Starting probing evaluation"
    );

    let (train, val) = load_data(config, loaders)?;
    let model = models.load(config)?;
    let mut evaluator = evaluators.build(
        config.device,
        model,
        train,
        val,
        ProbingConfig::new(),
        quick_debug,
    )?;

    let prober = evaluator.train_pred_prober()?;
    let losses = evaluator.evaluate_all(&prober)?;

    out.write_all(format_report(&losses).as_bytes())?;
    out.flush()?;
    Ok(losses)
}
