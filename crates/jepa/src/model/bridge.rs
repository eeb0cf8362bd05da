//! Tensor bridge: conversions between host-side `WallEpisode` buffers
//! (`Vec<f32>`) and burn tensors.
//!
//! The `trajectory` crate knows nothing about burn; this module is where
//! flattened episode data becomes batched tensors on a device, and where
//! scalar results come back to the host.

use burn::prelude::*;
use burn::tensor::TensorData;
use trajectory::{WallEpisode, LOCATION_DIM};

/// Stack episode frames into a `(batch, T, C, H, W)` tensor.
///
/// # Panics
/// Panics if `episodes` is empty or episodes disagree on length or frame shape.
pub fn states_to_tensor<B: Backend>(episodes: &[&WallEpisode], device: &B::Device) -> Tensor<B, 5> {
    assert!(!episodes.is_empty(), "episodes must not be empty");
    let first = episodes[0];
    for (i, ep) in episodes.iter().enumerate() {
        assert_eq!(
            (ep.num_steps, ep.frame),
            (first.num_steps, first.frame),
            "episode {i} has shape ({}, {}), expected ({}, {})",
            ep.num_steps,
            ep.frame,
            first.num_steps,
            first.frame
        );
    }

    let flat: Vec<f32> = episodes.iter().flat_map(|e| e.states.iter().copied()).collect();
    let shape = [
        episodes.len(),
        first.num_steps,
        first.frame.channels,
        first.frame.height,
        first.frame.width,
    ];
    Tensor::from_data(TensorData::new(flat, shape), device)
}

/// Stack episode actions into a `(batch, T-1, A)` tensor.
///
/// # Panics
/// Panics if `episodes` is empty or episodes disagree on length or action dimension.
pub fn actions_to_tensor<B: Backend>(episodes: &[&WallEpisode], device: &B::Device) -> Tensor<B, 3> {
    assert!(!episodes.is_empty(), "episodes must not be empty");
    let first = episodes[0];
    let n_actions = first.num_steps - 1;
    for (i, ep) in episodes.iter().enumerate() {
        assert_eq!(
            (ep.num_steps, ep.action_dim),
            (first.num_steps, first.action_dim),
            "episode {i} actions disagree with episode 0"
        );
    }

    let flat: Vec<f32> = episodes.iter().flat_map(|e| e.actions.iter().copied()).collect();
    Tensor::from_data(
        TensorData::new(flat, [episodes.len(), n_actions, first.action_dim]),
        device,
    )
}

/// Stack episode locations into a `(batch, T, 2)` tensor.
///
/// Returns `None` if any episode lacks locations.
pub fn locations_to_tensor<B: Backend>(
    episodes: &[&WallEpisode],
    device: &B::Device,
) -> Option<Tensor<B, 3>> {
    assert!(!episodes.is_empty(), "episodes must not be empty");
    let num_steps = episodes[0].num_steps;

    let mut flat = Vec::with_capacity(episodes.len() * num_steps * LOCATION_DIM);
    for ep in episodes {
        flat.extend_from_slice(ep.locations.as_deref()?);
    }
    Some(Tensor::from_data(
        TensorData::new(flat, [episodes.len(), num_steps, LOCATION_DIM]),
        device,
    ))
}

/// Extract a single f64 scalar from a burn 1D tensor.
///
/// # Panics
/// Panics if the tensor does not contain exactly one element.
pub fn tensor_to_f64<B: Backend>(tensor: Tensor<B, 1>) -> f64 {
    let val: f32 = tensor.into_scalar().elem();
    val as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use trajectory::FrameShape;

    type TestBackend = NdArray<f32>;

    fn make_episode(id: u64, num_steps: usize, with_locations: bool) -> WallEpisode {
        let frame = FrameShape::new(2, 3, 3);
        WallEpisode {
            episode_id: id,
            num_steps,
            frame,
            action_dim: 2,
            states: (0..num_steps * frame.numel())
                .map(|i| id as f32 * 1000.0 + i as f32)
                .collect(),
            actions: (0..(num_steps - 1) * 2).map(|i| id as f32 + i as f32 * 0.1).collect(),
            locations: with_locations.then(|| vec![id as f32; num_steps * LOCATION_DIM]),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_states_shape_and_values() {
        let device = Default::default();
        let a = make_episode(0, 4, true);
        let b = make_episode(1, 4, true);
        let tensor = states_to_tensor::<TestBackend>(&[&a, &b], &device);
        assert_eq!(tensor.dims(), [2, 4, 2, 3, 3]);

        // First value of the second episode.
        let val: f32 = tensor
            .slice([1..2, 0..1, 0..1, 0..1, 0..1])
            .reshape([1])
            .into_scalar()
            .elem();
        assert_eq!(val, 1000.0);
    }

    #[test]
    fn test_actions_shape() {
        let device = Default::default();
        let a = make_episode(0, 5, false);
        let b = make_episode(1, 5, false);
        let tensor = actions_to_tensor::<TestBackend>(&[&a, &b], &device);
        assert_eq!(tensor.dims(), [2, 4, 2]);

        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        assert!((values[8] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_locations_present_and_missing() {
        let device = Default::default();
        let a = make_episode(0, 3, true);
        let b = make_episode(1, 3, true);
        let c = make_episode(2, 3, false);

        let locs = locations_to_tensor::<TestBackend>(&[&a, &b], &device).unwrap();
        assert_eq!(locs.dims(), [2, 3, 2]);
        assert!(locations_to_tensor::<TestBackend>(&[&a, &c], &device).is_none());
    }

    #[test]
    #[should_panic(expected = "episode 1")]
    fn test_ragged_episodes_panic() {
        let device = Default::default();
        let a = make_episode(0, 3, true);
        let b = make_episode(1, 4, true);
        let _ = states_to_tensor::<TestBackend>(&[&a, &b], &device);
    }

    #[test]
    fn test_tensor_to_f64() {
        let device = Default::default();
        let scalar = Tensor::<TestBackend, 1>::from_data(TensorData::from([42.0_f32]), &device);
        assert!((tensor_to_f64::<TestBackend>(scalar) - 42.0).abs() < 1e-5);
    }
}
