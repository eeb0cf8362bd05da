//! Probing evaluation of pretrained JEPA models.
//!
//! [`driver::evaluate_model`] loads the probing splits and the model
//! checkpoint, trains a location prober and reports its loss per validation
//! split. The collaborators are traits; [`adapters`] binds them to burn and
//! [`mocks`] provides stubs for tests.

pub mod adapters;
pub mod config;
pub mod driver;
pub mod mocks;
pub mod pipeline;

pub use config::{build_main_config, load_eval_toml, ConfigOverrides, DataPaths, EvalToml, MainConfig};
pub use driver::{evaluate_model, format_report, load_data, LoaderRequest};
