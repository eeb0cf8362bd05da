//! Integration tests for the probing driver.
//!
//! Most tests run the driver against the mocks to check what it asks its
//! collaborators for and what it prints. The last test runs the burn adapters
//! end to end on synthetic Parquet splits and a freshly saved checkpoint.

use std::path::{Path, PathBuf};

use burn::backend::ndarray::NdArray;
use burn::backend::Autodiff;
use tempfile::TempDir;

use jepa::{save_model, DeviceConfig, JepaConfig, ModelLoadError};
use probe_eval::adapters::{CheckpointModelLoader, ProbingEvaluatorFactory, WallLoaderFactory};
use probe_eval::driver::{ModelLoader, NORMAL_SPLIT, WALL_SPLIT};
use probe_eval::mocks::{MockEvaluatorFactory, MockLoaderFactory, MockModelLoader};
use probe_eval::{evaluate_model, load_data, DataPaths, MainConfig};
use trajectory::{FrameShape, TrajectoryWriter, WallEpisode};

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<NdArray<f32>>;

fn config_with_root(root: &Path) -> MainConfig {
    MainConfig {
        device: DeviceConfig::Cpu,
        batch_size: 32,
        num_workers: 4,
        repr_dim: 256,
        action_dim: 2,
        model_weights_path: root.join("model_weights.mpk"),
        data: DataPaths {
            probe_train: root.join("probe_normal/train"),
            probe_normal_val: root.join("probe_normal/val"),
            probe_wall_val: root.join("probe_wall/val"),
        },
    }
}

fn config() -> MainConfig {
    config_with_root(Path::new("/data"))
}

fn run_with_mocks(
    config: &MainConfig,
    loaders: &MockLoaderFactory,
    models: &MockModelLoader,
    evaluators: &MockEvaluatorFactory,
) -> anyhow::Result<String> {
    let mut out = Vec::new();
    evaluate_model(config, loaders, models, evaluators, false, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_report_output_exact() {
    let loaders = MockLoaderFactory::new();
    let models = MockModelLoader::new();
    let evaluators = MockEvaluatorFactory::new(&[("normal", 0.1234), ("wall", 0.5)]);

    let output = run_with_mocks(&config(), &loaders, &models, &evaluators).unwrap();
    assert_eq!(
        output,
        "Average evaluation loss on normal dataset: 0.1234\n\
         Average evaluation loss on wall dataset: 0.5000\n"
    );
}

#[test]
fn test_load_data_returns_train_and_two_validation_splits() {
    let loaders = MockLoaderFactory::new();
    let (train, val) = load_data(&config(), &loaders).unwrap();

    assert_eq!(train.request.data_path, config().data.probe_train);
    assert!(train.request.train);
    assert_eq!(
        val.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![NORMAL_SPLIT, WALL_SPLIT]
    );
    assert_eq!(val[NORMAL_SPLIT].request.data_path, config().data.probe_normal_val);
    assert_eq!(val[WALL_SPLIT].request.data_path, config().data.probe_wall_val);
    assert_eq!(loaders.requests().len(), 3);
}

#[test]
fn test_loader_requests_are_probing_without_augmentation() {
    let loaders = MockLoaderFactory::new();
    load_data(&config(), &loaders).unwrap();

    let requests = loaders.requests();
    assert!(requests.iter().all(|r| r.probing && !r.augment));
    let train_flags: Vec<bool> = requests.iter().map(|r| r.train).collect();
    assert_eq!(train_flags, vec![true, false, false]);
    assert!(requests.iter().all(|r| r.batch_size == 32 && r.num_workers == 4));
}

#[test]
fn test_batch_size_and_workers_do_not_change_directories() {
    let base = config();
    let tuned = MainConfig {
        batch_size: 7,
        num_workers: 0,
        ..config()
    };

    let a = MockLoaderFactory::new();
    let b = MockLoaderFactory::new();
    load_data(&base, &a).unwrap();
    load_data(&tuned, &b).unwrap();

    let dirs = |f: &MockLoaderFactory| f.requests().into_iter().map(|r| r.data_path).collect::<Vec<_>>();
    assert_eq!(dirs(&a), dirs(&b));
    assert!(b.requests().iter().all(|r| r.batch_size == 7 && r.num_workers == 0));
}

#[test]
fn test_device_threaded_through_every_collaborator() {
    let config = MainConfig {
        device: DeviceConfig::auto(),
        ..config()
    };
    let loaders = MockLoaderFactory::new();
    let models = MockModelLoader::new();
    let evaluators = MockEvaluatorFactory::new(&[("normal", 1.0), ("wall", 2.0)]);
    run_with_mocks(&config, &loaders, &models, &evaluators).unwrap();

    assert!(loaders.requests().iter().all(|r| r.device == config.device));
    assert_eq!(models.calls().len(), 1);
    assert_eq!(models.calls()[0].device, config.device);

    let builds = evaluators.calls();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].device, config.device);
    assert_eq!(builds[0].model.device, config.device);
    assert_eq!(builds[0].train.request.device, config.device);
}

#[cfg(not(feature = "wgpu"))]
#[test]
fn test_device_defaults_to_cpu_without_accelerator() {
    let config = MainConfig {
        device: DeviceConfig::auto(),
        ..config()
    };
    assert_eq!(config.device.to_string(), "cpu");

    let loaders = MockLoaderFactory::new();
    load_data(&config, &loaders).unwrap();
    assert!(loaders.requests().iter().all(|r| r.device == DeviceConfig::Cpu));
}

#[test]
fn test_evaluator_built_with_default_probing_config() {
    let loaders = MockLoaderFactory::new();
    let models = MockModelLoader::new();
    let evaluators = MockEvaluatorFactory::new(&[("normal", 1.0), ("wall", 2.0)]);
    run_with_mocks(&config(), &loaders, &models, &evaluators).unwrap();

    let build = &evaluators.calls()[0];
    assert!(!build.quick_debug);
    assert_eq!(build.val_keys, vec!["normal".to_string(), "wall".to_string()]);
    assert_eq!(build.config.epochs, 20);
    assert_eq!(build.config.probe_targets, "locations");
    assert_eq!(build.model.repr_dim, 256);
    assert_eq!(build.model.action_dim, 2);
}

#[test]
fn test_loader_error_propagates_before_model_load() {
    let config = config();
    let loaders = MockLoaderFactory::failing_on(config.data.probe_wall_val.clone());
    let models = MockModelLoader::new();
    let evaluators = MockEvaluatorFactory::new(&[]);

    let err = run_with_mocks(&config, &loaders, &models, &evaluators).unwrap_err();
    assert!(err.to_string().contains("probe_wall/val"), "unexpected error: {err}");
    assert!(models.calls().is_empty());
    assert!(evaluators.calls().is_empty());
}

#[test]
fn test_model_error_propagates_without_output() {
    let loaders = MockLoaderFactory::new();
    let models = MockModelLoader::failing("Model weights not found at model_weights.mpk");
    let evaluators = MockEvaluatorFactory::new(&[("normal", 1.0)]);

    let mut out = Vec::new();
    let err = evaluate_model(&config(), &loaders, &models, &evaluators, false, &mut out).unwrap_err();
    assert_eq!(err.to_string(), "Model weights not found at model_weights.mpk");
    assert!(out.is_empty());
    assert!(evaluators.calls().is_empty());
}

#[test]
fn test_checkpoint_loader_reports_missing_weights() {
    let tmp = TempDir::new().unwrap();
    let config = config_with_root(tmp.path());

    let err = CheckpointModelLoader::<TestAutodiffBackend>::default()
        .load(&config)
        .unwrap_err();
    match err.downcast_ref::<ModelLoadError>() {
        Some(ModelLoadError::WeightsNotFound(path)) => assert_eq!(path, &config.model_weights_path),
        other => panic!("expected WeightsNotFound, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        format!("Model weights not found at {}", config.model_weights_path.display())
    );
}

// ---------------------------------------------------------------------------
// End to end on burn
// ---------------------------------------------------------------------------

fn random_walk_episode(id: u64, num_steps: usize) -> WallEpisode {
    let size = 16;
    let frame = FrameShape::new(2, size, size);
    let mut states = vec![0.0; num_steps * frame.numel()];
    let mut locations = Vec::with_capacity(num_steps * 2);
    let mut actions = Vec::with_capacity((num_steps - 1) * 2);
    let (mut x, mut y) = ((id as usize * 7) % size, (id as usize * 3) % size);
    for t in 0..num_steps {
        let base = t * frame.numel();
        states[base + y * size + x] = 1.0;
        states[base + size * size + (size / 2)] = 1.0;
        locations.extend([x as f32, y as f32]);
        if t + 1 < num_steps {
            let dx: isize = if (id + t as u64) % 2 == 0 { 1 } else { -1 };
            let nx = (x as isize + dx).clamp(0, size as isize - 1) as usize;
            actions.extend([(nx as isize - x as isize) as f32, 0.0]);
            x = nx;
            y = (y + 1) % size;
        }
    }
    WallEpisode {
        episode_id: id,
        num_steps,
        frame,
        action_dim: 2,
        states,
        actions,
        locations: Some(locations),
        source: "random_walk".to_string(),
    }
}

fn write_split(dir: &Path, episodes: u64) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let mut writer = TrajectoryWriter::new(dir.join("episodes.parquet"));
    for id in 0..episodes {
        writer.record(random_walk_episode(id, 6));
    }
    writer.finish().unwrap();
    dir.to_path_buf()
}

#[test]
fn test_evaluate_model_with_burn_adapters() {
    let tmp = TempDir::new().unwrap();
    let mut config = config_with_root(tmp.path());
    config.batch_size = 4;
    config.num_workers = 2;
    config.repr_dim = 32;

    write_split(&config.data.probe_train, 8);
    write_split(&config.data.probe_normal_val, 4);
    write_split(&config.data.probe_wall_val, 4);

    let model = JepaConfig::new(config.repr_dim, config.action_dim).init::<TestBackend>(&Default::default());
    save_model(&model, &config.model_weights_path).unwrap();

    let mut out = Vec::new();
    let losses = evaluate_model(
        &config,
        &WallLoaderFactory::<TestAutodiffBackend>::default(),
        &CheckpointModelLoader::<TestAutodiffBackend>::default(),
        &ProbingEvaluatorFactory::<TestAutodiffBackend>::default(),
        true,
        &mut out,
    )
    .unwrap();

    assert_eq!(losses.len(), 2);
    assert!(losses.values().all(|l| l.is_finite() && *l >= 0.0));

    let output = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Average evaluation loss on normal dataset: "));
    assert!(lines[1].starts_with("Average evaluation loss on wall dataset: "));
}
