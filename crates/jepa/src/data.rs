//! Wall dataset and batch loader.
//!
//! [`create_wall_dataloader`] reads a split directory of trajectory Parquet
//! files into a [`WallDataset`] and wraps it in a re-iterable [`WallLoader`]
//! that yields [`WallBatch`]es of tensors on the requested device.

use std::borrow::Cow;
use std::cell::RefCell;
use std::path::Path;
use std::sync::Arc;

use burn::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use trajectory::{FrameShape, TrajectoryReader, WallEpisode, LOCATION_DIM};

use crate::model::bridge::{actions_to_tensor, locations_to_tensor, states_to_tensor};

/// One batch of episodes on a device.
#[derive(Debug, Clone)]
pub struct WallBatch<B: Backend> {
    /// `(batch, T, C, H, W)`
    pub states: Tensor<B, 5>,
    /// `(batch, T-1, A)`
    pub actions: Tensor<B, 3>,
    /// `(batch, T, 2)`; present when the dataset was loaded for probing.
    pub locations: Option<Tensor<B, 3>>,
}

/// Episodes of one split, validated to share a single shape.
#[derive(Debug)]
pub struct WallDataset {
    episodes: Vec<WallEpisode>,
    frame: FrameShape,
    action_dim: usize,
    num_steps: usize,
    probing: bool,
}

impl WallDataset {
    /// Read every Parquet file in `dir`.
    pub fn load(dir: &Path, probing: bool, num_workers: usize) -> anyhow::Result<Self> {
        let episodes = TrajectoryReader::read_dir(dir, num_workers)?;
        let dataset = Self::from_episodes(episodes, probing)
            .map_err(|e| anyhow::anyhow!("Invalid dataset at {}: {e}", dir.display()))?;
        tracing::info!(
            path = %dir.display(),
            episodes = dataset.len(),
            num_steps = dataset.num_steps,
            frame = %dataset.frame,
            probing,
            "Loaded wall dataset"
        );
        Ok(dataset)
    }

    /// Build a dataset from in-memory episodes.
    ///
    /// All episodes must share length, frame shape and action dimension. When
    /// `probing` is set every episode must carry locations; otherwise
    /// locations are dropped.
    pub fn from_episodes(mut episodes: Vec<WallEpisode>, probing: bool) -> anyhow::Result<Self> {
        let first = episodes
            .first()
            .ok_or_else(|| anyhow::anyhow!("dataset contains no episodes"))?;
        let (frame, action_dim, num_steps) = (first.frame, first.action_dim, first.num_steps);

        for ep in &episodes {
            ep.validate()?;
            if ep.frame != frame || ep.action_dim != action_dim || ep.num_steps != num_steps {
                anyhow::bail!(
                    "episode {} has shape (T={}, frame={}, A={}), expected (T={num_steps}, frame={frame}, A={action_dim})",
                    ep.episode_id,
                    ep.num_steps,
                    ep.frame,
                    ep.action_dim
                );
            }
            if probing && !ep.has_locations() {
                anyhow::bail!("episode {} has no locations but probing was requested", ep.episode_id);
            }
        }

        if !probing {
            for ep in &mut episodes {
                ep.locations = None;
            }
        }

        Ok(Self {
            episodes,
            frame,
            action_dim,
            num_steps,
            probing,
        })
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn frame(&self) -> FrameShape {
        self.frame
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn probing(&self) -> bool {
        self.probing
    }

    pub fn episodes(&self) -> &[WallEpisode] {
        &self.episodes
    }
}

/// Mirror an episode left-to-right.
///
/// Frames are flipped along the width axis, the x component of every action
/// is negated, and location x becomes `(width - 1) - x`.
pub fn mirror_episode(episode: &WallEpisode) -> WallEpisode {
    let FrameShape {
        channels,
        height,
        width,
    } = episode.frame;

    let mut states = episode.states.clone();
    for plane in 0..episode.num_steps * channels {
        for row in 0..height {
            let start = (plane * height + row) * width;
            states[start..start + width].reverse();
        }
    }

    let mut actions = episode.actions.clone();
    if episode.action_dim > 0 {
        for a in actions.iter_mut().step_by(episode.action_dim) {
            *a = -*a;
        }
    }

    let locations = episode.locations.as_ref().map(|locs| {
        let mut locs = locs.clone();
        for x in locs.iter_mut().step_by(LOCATION_DIM) {
            *x = (width as f32 - 1.0) - *x;
        }
        locs
    });

    WallEpisode {
        states,
        actions,
        locations,
        ..episode.clone()
    }
}

/// Re-iterable batch source over a [`WallDataset`].
///
/// Every call to [`WallLoader::iter`] starts a new pass. Training loaders
/// shuffle the episode order per pass; incomplete trailing batches are
/// dropped.
pub struct WallLoader<B: Backend> {
    dataset: Arc<WallDataset>,
    device: B::Device,
    batch_size: usize,
    train: bool,
    augment: bool,
    rng: RefCell<StdRng>,
}

impl<B: Backend> WallLoader<B> {
    pub fn new(
        dataset: Arc<WallDataset>,
        device: B::Device,
        batch_size: usize,
        train: bool,
        augment: bool,
    ) -> anyhow::Result<Self> {
        if batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        Ok(Self {
            dataset,
            device,
            batch_size,
            train,
            augment,
            rng: RefCell::new(StdRng::from_entropy()),
        })
    }

    /// Reseed the shuffling and augmentation RNG.
    pub fn with_seed(self, seed: u64) -> Self {
        self.rng.replace(StdRng::seed_from_u64(seed));
        self
    }

    pub fn dataset(&self) -> &WallDataset {
        &self.dataset
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_train(&self) -> bool {
        self.train
    }

    pub fn augments(&self) -> bool {
        self.augment
    }

    /// Number of full batches per pass.
    pub fn num_batches(&self) -> usize {
        self.dataset.len() / self.batch_size
    }

    /// Start a new pass over the dataset.
    pub fn iter(&self) -> WallBatches<'_, B> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        let mut rng = self.rng.borrow_mut();
        if self.train {
            order.shuffle(&mut *rng);
        }
        let mirror: Vec<bool> = if self.train && self.augment {
            order.iter().map(|_| rng.gen_bool(0.5)).collect()
        } else {
            vec![false; order.len()]
        };

        WallBatches {
            loader: self,
            order,
            mirror,
            batch: 0,
        }
    }
}

/// One pass over a [`WallLoader`].
pub struct WallBatches<'a, B: Backend> {
    loader: &'a WallLoader<B>,
    order: Vec<usize>,
    mirror: Vec<bool>,
    batch: usize,
}

impl<B: Backend> Iterator for WallBatches<'_, B> {
    type Item = WallBatch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.loader.batch_size;
        let start = self.batch * size;
        if start + size > self.order.len() {
            return None;
        }
        self.batch += 1;

        let episodes = self.loader.dataset.episodes();
        let owned: Vec<Cow<'_, WallEpisode>> = (start..start + size)
            .map(|i| {
                let episode = &episodes[self.order[i]];
                if self.mirror[i] {
                    Cow::Owned(mirror_episode(episode))
                } else {
                    Cow::Borrowed(episode)
                }
            })
            .collect();
        let selected: Vec<&WallEpisode> = owned.iter().map(|e| e.as_ref()).collect();

        let device = &self.loader.device;
        Some(WallBatch {
            states: states_to_tensor(&selected, device),
            actions: actions_to_tensor(&selected, device),
            locations: if self.loader.dataset.probing() {
                locations_to_tensor(&selected, device)
            } else {
                None
            },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.loader.num_batches().saturating_sub(self.batch);
        (remaining, Some(remaining))
    }
}

/// Build a batch loader over the trajectory files in `data_path`.
///
/// `probing` requires and loads agent locations; `train` enables per-pass
/// shuffling; `augment` (training only) mirrors episodes with probability
/// 0.5. Files are decoded on up to `num_workers` threads.
pub fn create_wall_dataloader<B: Backend>(
    data_path: &Path,
    probing: bool,
    device: &B::Device,
    batch_size: usize,
    train: bool,
    augment: bool,
    num_workers: usize,
) -> anyhow::Result<WallLoader<B>> {
    if batch_size == 0 {
        anyhow::bail!("batch_size must be positive");
    }
    let dataset = WallDataset::load(data_path, probing, num_workers)?;
    if dataset.len() < batch_size {
        tracing::warn!(
            path = %data_path.display(),
            episodes = dataset.len(),
            batch_size,
            "Dataset smaller than one batch; loader will yield nothing"
        );
    }
    WallLoader::new(Arc::new(dataset), device.clone(), batch_size, train, augment)
}
