//! Saving and loading JEPA weights.
//!
//! Weights are stored with burn's `NamedMpkFileRecorder` at full precision.
//! The recorder always writes `<stem>.mpk`, so a path given with or without
//! the extension refers to the same file.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;
use thiserror::Error;

use crate::model::jepa::{JepaConfig, JepaModel};

/// Extension the recorder appends to weight files.
pub const WEIGHTS_EXTENSION: &str = "mpk";

/// Errors from [`load_model`].
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Model weights not found at {}", .0.display())]
    WeightsNotFound(PathBuf),
    #[error("Failed to load model weights from {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },
    #[error("Weight {tensor} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        tensor: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}

/// The file the recorder actually reads or writes for `path`.
pub fn weights_file(path: &Path) -> PathBuf {
    path.with_extension(WEIGHTS_EXTENSION)
}

/// Load weights into a freshly built model and switch it to evaluation mode.
///
/// The model is constructed on the autodiff backend `B` and returned on its
/// inner backend, so dropout is disabled and no autodiff graph is recorded.
/// The weights file must exist before any model is built. A path that
/// exists in another format with no `.mpk` next to it is `LoadFailed`;
/// otherwise a missing file is `WeightsNotFound` naming the `.mpk` path.
pub fn load_model<B: AutodiffBackend>(
    weights_path: &Path,
    config: &JepaConfig,
    device: &B::Device,
) -> Result<JepaModel<B::InnerBackend>, ModelLoadError> {
    let file = weights_file(weights_path);
    if !file.is_file() {
        if weights_path.is_file() {
            return Err(ModelLoadError::LoadFailed {
                path: weights_path.to_path_buf(),
                reason: format!("not a burn weights file; expected {}", file.display()),
            });
        }
        return Err(ModelLoadError::WeightsNotFound(file));
    }

    let model: JepaModel<B> = config
        .init::<B>(device)
        .load_file(
            weights_path,
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            device,
        )
        .map_err(|e| ModelLoadError::LoadFailed {
            path: weights_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let actual = model.weight_shapes();
    for ((tensor, expected), (_, found)) in config.expected_weight_shapes().into_iter().zip(actual) {
        if expected != found {
            return Err(ModelLoadError::ShapeMismatch {
                tensor,
                expected,
                found,
            });
        }
    }

    tracing::info!(
        path = %file.display(),
        repr_dim = model.repr_dim(),
        action_dim = model.action_dim(),
        params = model.num_params(),
        "Loaded JEPA model"
    );
    Ok(model.valid())
}

/// Save model weights, returning the file actually written.
pub fn save_model<B: Backend>(model: &JepaModel<B>, path: &Path) -> anyhow::Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    model
        .clone()
        .save_file(path, &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
        .map_err(|e| anyhow::anyhow!("Failed to save model to {}: {e}", path.display()))?;
    let file = weights_file(path);
    tracing::info!(path = %file.display(), "Saved JEPA model");
    Ok(file)
}
