//! Data types for recorded episodes and dataset summaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of coordinates in an agent location (x, y).
pub const LOCATION_DIM: usize = 2;

/// Shape of a single observation frame: `(channels, height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl FrameShape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
        }
    }

    /// Number of scalar values in one frame.
    pub fn numel(&self) -> usize {
        self.channels * self.height * self.width
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.height, self.width)
    }
}

/// One recorded episode of the wall environment.
///
/// All per-step data is stored flattened in row-major order:
/// - `states`: `num_steps * channels * height * width`
/// - `actions`: `(num_steps - 1) * action_dim`
/// - `locations`: `num_steps * 2`, present only for probing splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallEpisode {
    /// Identifier of the episode within its source.
    pub episode_id: u64,
    /// Number of observation frames in the episode.
    pub num_steps: usize,
    /// Shape of each observation frame.
    pub frame: FrameShape,
    /// Dimension of each action vector.
    pub action_dim: usize,
    /// Flattened observation frames.
    pub states: Vec<f32>,
    /// Flattened actions, one fewer than frames.
    pub actions: Vec<f32>,
    /// Flattened agent locations, if recorded.
    pub locations: Option<Vec<f32>>,
    /// Free-form name of the generator or split that produced this episode.
    pub source: String,
}

impl WallEpisode {
    /// Check that the flattened buffers match the declared shape.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_steps == 0 {
            anyhow::bail!("episode {} has no frames", self.episode_id);
        }
        let expected_states = self.num_steps * self.frame.numel();
        if self.states.len() != expected_states {
            anyhow::bail!(
                "episode {}: states has {} values, expected {} ({} frames of {})",
                self.episode_id,
                self.states.len(),
                expected_states,
                self.num_steps,
                self.frame
            );
        }
        let expected_actions = (self.num_steps - 1) * self.action_dim;
        if self.actions.len() != expected_actions {
            anyhow::bail!(
                "episode {}: actions has {} values, expected {}",
                self.episode_id,
                self.actions.len(),
                expected_actions
            );
        }
        if let Some(locations) = &self.locations {
            let expected = self.num_steps * LOCATION_DIM;
            if locations.len() != expected {
                anyhow::bail!(
                    "episode {}: locations has {} values, expected {}",
                    self.episode_id,
                    locations.len(),
                    expected
                );
            }
        }
        Ok(())
    }

    /// Whether agent locations were recorded for this episode.
    pub fn has_locations(&self) -> bool {
        self.locations.is_some()
    }

    /// Slice of the flattened frame at `step`.
    pub fn frame_at(&self, step: usize) -> &[f32] {
        let n = self.frame.numel();
        &self.states[step * n..(step + 1) * n]
    }
}

/// Quick statistics over a dataset split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    /// Number of Parquet files read.
    pub files: usize,
    /// Total number of episodes.
    pub episodes: usize,
    /// Total number of observation frames across all episodes.
    pub total_frames: usize,
    /// Shortest episode length (0 when empty).
    pub min_steps: usize,
    /// Longest episode length.
    pub max_steps: usize,
    /// Episodes that carry agent locations.
    pub with_locations: usize,
    /// Distinct frame shapes seen, formatted as `CxHxW`.
    pub frame_shapes: Vec<String>,
}

impl DatasetSummary {
    /// Fold a set of episodes into a summary.
    pub fn from_episodes(files: usize, episodes: &[WallEpisode]) -> Self {
        let mut shapes: Vec<String> = Vec::new();
        for episode in episodes {
            let shape = episode.frame.to_string();
            if !shapes.contains(&shape) {
                shapes.push(shape);
            }
        }

        Self {
            files,
            episodes: episodes.len(),
            total_frames: episodes.iter().map(|e| e.num_steps).sum(),
            min_steps: episodes.iter().map(|e| e.num_steps).min().unwrap_or(0),
            max_steps: episodes.iter().map(|e| e.num_steps).max().unwrap_or(0),
            with_locations: episodes.iter().filter(|e| e.has_locations()).count(),
            frame_shapes: shapes,
        }
    }
}
