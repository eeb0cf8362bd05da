//! burn-backed implementations of the driver traits.
//!
//! `B` is the autodiff backend the prober trains on. Loaders and the frozen
//! model live on `B::InnerBackend`.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use burn::tensor::backend::AutodiffBackend;
use jepa::{
    create_wall_dataloader, load_model, DeviceConfig, JepaConfig, JepaModel, Prober,
    ProbingConfig, ProbingEvaluator, ResolveDevice, WallLoader,
};

use crate::config::MainConfig;
use crate::driver::{DataLoaderFactory, EvaluatorFactory, LoaderRequest, ModelLoader, ProbeEvaluator};

/// Reads trajectory Parquet directories into [`WallLoader`]s.
pub struct WallLoaderFactory<B> {
    _backend: PhantomData<B>,
}

impl<B> Default for WallLoaderFactory<B> {
    fn default() -> Self {
        Self {
            _backend: PhantomData,
        }
    }
}

impl<B: AutodiffBackend + ResolveDevice> DataLoaderFactory for WallLoaderFactory<B> {
    type Loader = WallLoader<B::InnerBackend>;

    fn create(&self, request: &LoaderRequest) -> anyhow::Result<Self::Loader> {
        let device = B::resolve_device(&request.device)?;
        create_wall_dataloader::<B::InnerBackend>(
            &request.data_path,
            request.probing,
            &device,
            request.batch_size,
            request.train,
            request.augment,
            request.num_workers,
        )
    }
}

/// Loads a [`JepaModel`] checkpoint in evaluation mode.
pub struct CheckpointModelLoader<B> {
    _backend: PhantomData<B>,
}

impl<B> Default for CheckpointModelLoader<B> {
    fn default() -> Self {
        Self {
            _backend: PhantomData,
        }
    }
}

impl<B: AutodiffBackend + ResolveDevice> ModelLoader for CheckpointModelLoader<B> {
    type Model = JepaModel<B::InnerBackend>;

    fn load(&self, config: &MainConfig) -> anyhow::Result<Self::Model> {
        let device = B::resolve_device(&config.device)?;
        let model_config = JepaConfig::new(config.repr_dim, config.action_dim);
        Ok(load_model::<B>(&config.model_weights_path, &model_config, &device)?)
    }
}

/// Builds [`ProbingEvaluator`]s.
pub struct ProbingEvaluatorFactory<B> {
    _backend: PhantomData<B>,
}

impl<B> Default for ProbingEvaluatorFactory<B> {
    fn default() -> Self {
        Self {
            _backend: PhantomData,
        }
    }
}

impl<B: AutodiffBackend + ResolveDevice>
    EvaluatorFactory<WallLoader<B::InnerBackend>, JepaModel<B::InnerBackend>>
    for ProbingEvaluatorFactory<B>
{
    type Evaluator = ProbingEvaluator<B>;

    fn build(
        &self,
        device: DeviceConfig,
        model: JepaModel<B::InnerBackend>,
        train: WallLoader<B::InnerBackend>,
        val: BTreeMap<String, WallLoader<B::InnerBackend>>,
        config: ProbingConfig,
        quick_debug: bool,
    ) -> anyhow::Result<Self::Evaluator> {
        let device = B::resolve_device(&device)?;
        ProbingEvaluator::new(device, model, train, val, config, quick_debug)
    }
}

impl<B: AutodiffBackend> ProbeEvaluator for ProbingEvaluator<B> {
    type Prober = Prober<B>;

    fn train_pred_prober(&mut self) -> anyhow::Result<Self::Prober> {
        ProbingEvaluator::train_pred_prober(self)
    }

    fn evaluate_all(&self, prober: &Self::Prober) -> anyhow::Result<BTreeMap<String, f64>> {
        ProbingEvaluator::evaluate_all(self, prober)
    }
}
