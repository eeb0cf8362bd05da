//! Evaluation config and TOML loading.
//!
//! `MainConfig` has no built-in defaults: the caller supplies a base config,
//! an optional `EvalToml` file overrides it, and CLI flags override both.

use std::path::{Path, PathBuf};

use jepa::DeviceConfig;
use serde::Deserialize;

/// Directories of the three probing splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Training split for the prober.
    pub probe_train: PathBuf,
    /// Validation split drawn like the training split.
    pub probe_normal_val: PathBuf,
    /// Validation split with wall interactions.
    pub probe_wall_val: PathBuf,
}

/// Everything one evaluation run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainConfig {
    pub device: DeviceConfig,
    pub batch_size: usize,
    pub num_workers: usize,
    pub repr_dim: usize,
    pub action_dim: usize,
    pub model_weights_path: PathBuf,
    pub data: DataPaths,
}

/// Top-level structure of an evaluation TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalToml {
    #[serde(default)]
    pub model: ModelOverrides,
    #[serde(default)]
    pub data: DataOverrides,
    #[serde(default)]
    pub loader: LoaderOverrides,
}

/// `[model]` section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOverrides {
    /// `cpu`, `gpu` or `gpu:<n>`.
    pub device: Option<String>,
    pub repr_dim: Option<usize>,
    pub action_dim: Option<usize>,
    pub weights: Option<PathBuf>,
}

/// `[data]` section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataOverrides {
    pub probe_train: Option<PathBuf>,
    pub probe_normal_val: Option<PathBuf>,
    pub probe_wall_val: Option<PathBuf>,
}

/// `[loader]` section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderOverrides {
    pub batch_size: Option<usize>,
    pub num_workers: Option<usize>,
}

/// Load and deserialize an `EvalToml` from a TOML file.
pub fn load_eval_toml(path: &Path) -> anyhow::Result<EvalToml> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
    let config: EvalToml = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), "Loaded eval config");
    Ok(config)
}

impl EvalToml {
    /// Flatten the sections into a single override set.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            device: self.model.device.clone(),
            batch_size: self.loader.batch_size,
            num_workers: self.loader.num_workers,
            repr_dim: self.model.repr_dim,
            action_dim: self.model.action_dim,
            model_weights_path: self.model.weights.clone(),
            probe_train: self.data.probe_train.clone(),
            probe_normal_val: self.data.probe_normal_val.clone(),
            probe_wall_val: self.data.probe_wall_val.clone(),
        }
    }
}

/// Optional value for every `MainConfig` field.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub device: Option<String>,
    pub batch_size: Option<usize>,
    pub num_workers: Option<usize>,
    pub repr_dim: Option<usize>,
    pub action_dim: Option<usize>,
    pub model_weights_path: Option<PathBuf>,
    pub probe_train: Option<PathBuf>,
    pub probe_normal_val: Option<PathBuf>,
    pub probe_wall_val: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Apply every set field on top of `config`.
    pub fn apply(&self, mut config: MainConfig) -> anyhow::Result<MainConfig> {
        if let Some(device) = &self.device {
            config.device = device.parse()?;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(n) = self.num_workers {
            config.num_workers = n;
        }
        if let Some(n) = self.repr_dim {
            config.repr_dim = n;
        }
        if let Some(n) = self.action_dim {
            config.action_dim = n;
        }
        if let Some(p) = &self.model_weights_path {
            config.model_weights_path = p.clone();
        }
        if let Some(p) = &self.probe_train {
            config.data.probe_train = p.clone();
        }
        if let Some(p) = &self.probe_normal_val {
            config.data.probe_normal_val = p.clone();
        }
        if let Some(p) = &self.probe_wall_val {
            config.data.probe_wall_val = p.clone();
        }
        Ok(config)
    }
}

/// Build the run config.
///
/// Priority chain: `defaults` < TOML values < CLI flags.
pub fn build_main_config(
    defaults: MainConfig,
    toml: Option<&EvalToml>,
    cli: &ConfigOverrides,
) -> anyhow::Result<MainConfig> {
    let config = match toml {
        Some(file) => file.overrides().apply(defaults)?,
        None => defaults,
    };
    cli.apply(config)
}
