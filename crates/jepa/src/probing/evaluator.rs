//! Prober training and evaluation on frozen JEPA predictions.
//!
//! The model stays on the inner (non-autodiff) backend for the whole run.
//! Its predicted representations are lifted onto the autodiff backend as
//! constants, so gradients reach only the prober.

use std::collections::BTreeMap;
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::SeedableRng;
use trajectory::LOCATION_DIM;

use crate::data::WallLoader;
use crate::model::bridge::tensor_to_f64;
use crate::model::jepa::JepaModel;
use crate::probing::loss::location_losses;
use crate::probing::normalizer::Normalizer;
use crate::probing::prober::{Prober, ProberConfig};
use crate::probing::schedule::LrSchedule;

/// Batches per epoch (and per evaluation split) in quick-debug mode.
const QUICK_DEBUG_STEPS: usize = 3;

/// Configuration for location probing.
#[derive(Config, Debug)]
pub struct ProbingConfig {
    /// What the prober regresses; only `"locations"` is supported.
    #[config(default = "String::from(\"locations\")")]
    pub probe_targets: String,
    /// Base learning rate for Adam.
    #[config(default = 0.0002)]
    pub lr: f64,
    /// Passes over the training split.
    #[config(default = 20)]
    pub epochs: usize,
    #[config(default = "LrSchedule::Cosine")]
    pub schedule: LrSchedule,
    /// Timesteps sampled per training batch when episodes are longer.
    #[config(default = 30)]
    pub sample_timesteps: usize,
    /// Hidden widths of the prober, `-`-separated.
    #[config(default = "String::from(\"256\")")]
    pub prober_arch: String,
    /// Linear warmup steps before the schedule applies.
    #[config(default = 0)]
    pub warmup_steps: usize,
    /// Steps between running-loss log lines.
    #[config(default = 50)]
    pub log_interval: usize,
    /// Seed for timestep sampling and prober initialization.
    pub seed: Option<u64>,
}

struct RunningLoss {
    sum: f64,
    count: usize,
}

impl RunningLoss {
    fn new() -> Self {
        Self { sum: 0.0, count: 0 }
    }

    fn update(&mut self, loss: f64) {
        self.sum += loss;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Trains a location prober on the training split and scores it on every
/// validation split.
pub struct ProbingEvaluator<B: AutodiffBackend> {
    device: B::Device,
    model: JepaModel<B::InnerBackend>,
    train: WallLoader<B::InnerBackend>,
    val: BTreeMap<String, WallLoader<B::InnerBackend>>,
    config: ProbingConfig,
    quick_debug: bool,
    normalizer: Normalizer,
    rng: StdRng,
}

impl<B: AutodiffBackend> ProbingEvaluator<B> {
    pub fn new(
        device: B::Device,
        model: JepaModel<B::InnerBackend>,
        train: WallLoader<B::InnerBackend>,
        val: BTreeMap<String, WallLoader<B::InnerBackend>>,
        config: ProbingConfig,
        quick_debug: bool,
    ) -> anyhow::Result<Self> {
        if config.probe_targets != "locations" {
            anyhow::bail!(
                "Unsupported probe target {:?}; only \"locations\" is supported",
                config.probe_targets
            );
        }
        if !train.dataset().probing() {
            anyhow::bail!("Training split was not loaded with locations");
        }
        if let Some((name, _)) = val.iter().find(|(_, loader)| !loader.dataset().probing()) {
            anyhow::bail!("Validation split {name} was not loaded with locations");
        }
        if config.sample_timesteps == 0 {
            anyhow::bail!("sample_timesteps must be positive");
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            device,
            model,
            train,
            val,
            config,
            quick_debug,
            normalizer: Normalizer::default(),
            rng,
        })
    }

    /// Train a fresh prober on the model's predicted representations.
    pub fn train_pred_prober(&mut self) -> anyhow::Result<Prober<B>> {
        if let Some(seed) = self.config.seed {
            B::seed(seed);
        }

        let repr_dim = self.model.repr_dim();
        let mut prober = ProberConfig::new(repr_dim, LOCATION_DIM)
            .with_arch(self.config.prober_arch.clone())
            .init::<B>(&self.device)?;
        let mut optimizer = AdamConfig::new().init();

        let epochs = if self.quick_debug { 1 } else { self.config.epochs };
        let mut steps_per_epoch = self.train.num_batches();
        if self.quick_debug {
            steps_per_epoch = steps_per_epoch.min(QUICK_DEBUG_STEPS);
        }
        if steps_per_epoch == 0 {
            anyhow::bail!(
                "Training split has {} episodes, fewer than one batch of {}",
                self.train.dataset().len(),
                self.train.batch_size()
            );
        }
        let total_steps = epochs * steps_per_epoch;

        tracing::info!(
            epochs,
            steps_per_epoch,
            repr_dim,
            arch = %self.config.prober_arch,
            lr = self.config.lr,
            "Training location prober"
        );

        let start = Instant::now();
        let mut running = RunningLoss::new();
        let mut step = 0usize;

        for epoch in 0..epochs {
            let mut epoch_loss = RunningLoss::new();
            for batch in self.train.iter().take(steps_per_epoch) {
                let locations = batch
                    .locations
                    .ok_or_else(|| anyhow::anyhow!("Training batch carries no locations"))?;

                let pred_encs = self.model.forward(batch.states, batch.actions);
                let (pred_encs, locations) = sample_timesteps(
                    &mut self.rng,
                    self.config.sample_timesteps,
                    pred_encs,
                    locations,
                );
                let target = self.normalizer.normalize_location(locations);

                let pred_encs = Tensor::<B, 3>::from_inner(pred_encs);
                let target = Tensor::<B, 3>::from_inner(target);

                let pred_locs = prober.forward_sequence(pred_encs);
                let loss = location_losses(pred_locs, target).mean();
                let loss_value = tensor_to_f64(loss.clone().inner());

                let grads = GradientsParams::from_grads(loss.backward(), &prober);
                let lr = self.config.schedule.lr_at(
                    self.config.lr,
                    self.config.warmup_steps,
                    total_steps,
                    step,
                );
                prober = optimizer.step(lr, prober, grads);

                running.update(loss_value);
                epoch_loss.update(loss_value);
                step += 1;

                if self.config.log_interval > 0 && step % self.config.log_interval == 0 {
                    if let Some(mean) = running.mean() {
                        tracing::info!(step, total_steps, lr, loss = format!("{mean:.4}"), "Prober step");
                    }
                    running.reset();
                }
            }

            tracing::info!(
                epoch = epoch + 1,
                epochs,
                loss = format!("{:.4}", epoch_loss.mean().unwrap_or(f64::NAN)),
                elapsed_secs = start.elapsed().as_secs(),
                "Prober epoch complete"
            );
        }

        Ok(prober)
    }

    /// Mean unnormalized location error of `prober` on one validation split.
    pub fn evaluate_pred_prober(&self, prober: &Prober<B>, split: &str) -> anyhow::Result<f64> {
        let loader = self
            .val
            .get(split)
            .ok_or_else(|| anyhow::anyhow!("Unknown validation split {split:?}"))?;
        let prober = prober.valid();

        let max_batches = if self.quick_debug {
            QUICK_DEBUG_STEPS
        } else {
            usize::MAX
        };

        let mut total: Option<Tensor<B::InnerBackend, 2>> = None;
        let mut batches = 0usize;
        for batch in loader.iter().take(max_batches) {
            let locations = batch
                .locations
                .ok_or_else(|| anyhow::anyhow!("Validation batch of {split} carries no locations"))?;
            let pred_encs = self.model.forward(batch.states, batch.actions);
            let pred_locs = prober.forward_sequence(pred_encs);
            let target = self.normalizer.normalize_location(locations);
            let losses = location_losses(pred_locs, target);

            total = Some(match total {
                Some(acc) => acc + losses,
                None => losses,
            });
            batches += 1;
        }

        let total = total.ok_or_else(|| {
            anyhow::anyhow!(
                "Validation split {split} has {} episodes, fewer than one batch of {}",
                loader.dataset().len(),
                loader.batch_size()
            )
        })?;
        let per_step = self.normalizer.unnormalize_mse(total.div_scalar(batches as f32));
        let loss = tensor_to_f64(per_step.mean());

        tracing::info!(split, batches, loss = format!("{loss:.4}"), "Evaluated prober");
        Ok(loss)
    }

    /// Evaluate `prober` on every validation split, keyed by split name.
    pub fn evaluate_all(&self, prober: &Prober<B>) -> anyhow::Result<BTreeMap<String, f64>> {
        self.val
            .keys()
            .map(|name| Ok((name.clone(), self.evaluate_pred_prober(prober, name)?)))
            .collect()
    }
}

/// Keep a random, order-preserving subset of `k` timesteps when the episode
/// is longer than `k`.
fn sample_timesteps<B: Backend>(
    rng: &mut StdRng,
    k: usize,
    pred_encs: Tensor<B, 3>,
    locations: Tensor<B, 3>,
) -> (Tensor<B, 3>, Tensor<B, 3>) {
    let [_, steps, _] = pred_encs.dims();
    if steps <= k {
        return (pred_encs, locations);
    }

    let mut picked = rand::seq::index::sample(rng, steps, k).into_vec();
    picked.sort_unstable();
    let picked: Vec<i64> = picked.into_iter().map(|i| i as i64).collect();
    let indices = Tensor::<B, 1, Int>::from_data(TensorData::new(picked, [k]), &pred_encs.device());

    (
        pred_encs.select(1, indices.clone()),
        locations.select(1, indices),
    )
}
