//! Mock implementations of the driver traits for testing without data or
//! weights on disk.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use jepa::{DeviceConfig, ProbingConfig};

use crate::config::MainConfig;
use crate::driver::{DataLoaderFactory, EvaluatorFactory, LoaderRequest, ModelLoader, ProbeEvaluator};

// ---------------------------------------------------------------------------
// MockLoaderFactory
// ---------------------------------------------------------------------------

/// Handle returned by [`MockLoaderFactory`]; remembers how it was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockLoader {
    pub request: LoaderRequest,
}

/// Records every loader request; optionally fails for one directory.
#[derive(Default)]
pub struct MockLoaderFactory {
    requests: Mutex<Vec<LoaderRequest>>,
    fail_on: Option<PathBuf>,
}

impl MockLoaderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with an error when asked for `path`.
    pub fn failing_on(path: impl Into<PathBuf>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_on: Some(path.into()),
        }
    }

    pub fn requests(&self) -> Vec<LoaderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl DataLoaderFactory for MockLoaderFactory {
    type Loader = MockLoader;

    fn create(&self, request: &LoaderRequest) -> anyhow::Result<MockLoader> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_on.as_ref() == Some(&request.data_path) {
            anyhow::bail!("No parquet files found in {}", request.data_path.display());
        }
        Ok(MockLoader {
            request: request.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockModelLoader
// ---------------------------------------------------------------------------

/// Model stand-in carrying the config it was loaded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockModel {
    pub device: DeviceConfig,
    pub repr_dim: usize,
    pub action_dim: usize,
}

/// Records load calls; can be made to fail.
#[derive(Default)]
pub struct MockModelLoader {
    calls: Mutex<Vec<MainConfig>>,
    error: Option<String>,
}

impl MockModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every load with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            error: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<MainConfig> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelLoader for MockModelLoader {
    type Model = MockModel;

    fn load(&self, config: &MainConfig) -> anyhow::Result<MockModel> {
        self.calls.lock().unwrap().push(config.clone());
        if let Some(message) = &self.error {
            anyhow::bail!("{message}");
        }
        Ok(MockModel {
            device: config.device,
            repr_dim: config.repr_dim,
            action_dim: config.action_dim,
        })
    }
}

// ---------------------------------------------------------------------------
// MockEvaluatorFactory / MockEvaluator
// ---------------------------------------------------------------------------

/// What [`MockEvaluatorFactory::build`] was called with.
#[derive(Debug, Clone)]
pub struct BuildCall {
    pub device: DeviceConfig,
    pub model: MockModel,
    pub train: MockLoader,
    pub val_keys: Vec<String>,
    pub config: ProbingConfig,
    pub quick_debug: bool,
}

/// Builds [`MockEvaluator`]s that report fixed losses.
pub struct MockEvaluatorFactory {
    losses: BTreeMap<String, f64>,
    calls: Mutex<Vec<BuildCall>>,
}

impl MockEvaluatorFactory {
    pub fn new(losses: &[(&str, f64)]) -> Self {
        Self {
            losses: losses.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<BuildCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl EvaluatorFactory<MockLoader, MockModel> for MockEvaluatorFactory {
    type Evaluator = MockEvaluator;

    fn build(
        &self,
        device: DeviceConfig,
        model: MockModel,
        train: MockLoader,
        val: BTreeMap<String, MockLoader>,
        config: ProbingConfig,
        quick_debug: bool,
    ) -> anyhow::Result<MockEvaluator> {
        self.calls.lock().unwrap().push(BuildCall {
            device,
            model,
            train,
            val_keys: val.keys().cloned().collect(),
            config,
            quick_debug,
        });
        Ok(MockEvaluator {
            losses: self.losses.clone(),
            trained: false,
        })
    }
}

/// Evaluator whose prober is a unit value and whose losses are canned.
pub struct MockEvaluator {
    losses: BTreeMap<String, f64>,
    trained: bool,
}

impl ProbeEvaluator for MockEvaluator {
    type Prober = ();

    fn train_pred_prober(&mut self) -> anyhow::Result<()> {
        self.trained = true;
        Ok(())
    }

    fn evaluate_all(&self, _prober: &()) -> anyhow::Result<BTreeMap<String, f64>> {
        if !self.trained {
            anyhow::bail!("evaluate_all called before train_pred_prober");
        }
        Ok(self.losses.clone())
    }
}
