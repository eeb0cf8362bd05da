//! Joint-embedding predictive model (JEPA) and location probing on burn.
//!
//! Loads a pretrained `JepaModel` from a checkpoint, turns recorded wall
//! episodes into batches of tensors, and trains a small prober that regresses
//! the agent location from the model's frozen predicted representations.

pub mod checkpoint;
pub mod data;
pub mod device;
pub mod model;
pub mod probing;

pub use checkpoint::{load_model, save_model, ModelLoadError};
pub use data::{create_wall_dataloader, WallBatch, WallDataset, WallLoader};
pub use device::{DeviceConfig, ResolveDevice};
pub use model::jepa::{JepaConfig, JepaModel};
pub use probing::evaluator::{ProbingConfig, ProbingEvaluator};
pub use probing::prober::{Prober, ProberConfig};
