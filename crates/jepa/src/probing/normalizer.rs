use burn::prelude::*;
use burn::tensor::TensorData;

/// Per-coordinate mean of agent locations over the probing data.
pub const LOCATION_MEAN: [f32; 2] = [31.5863, 32.0618];
/// Per-coordinate standard deviation of agent locations.
pub const LOCATION_STD: [f32; 2] = [16.1025, 16.1353];

/// Standardizes locations for prober training and maps errors back to
/// pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    pub mean: [f32; 2],
    pub std: [f32; 2],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            mean: LOCATION_MEAN,
            std: LOCATION_STD,
        }
    }
}

impl Normalizer {
    /// `(loc - mean) / std` over the trailing coordinate axis.
    pub fn normalize_location<B: Backend, const D: usize>(&self, location: Tensor<B, D>) -> Tensor<B, D> {
        let device = location.device();
        let mean = broadcast_coords::<B, D>(self.mean, &device);
        let std = broadcast_coords::<B, D>(self.std, &device);
        (location - mean) / std
    }

    /// Scale squared errors computed in normalized space back to pixel² units.
    pub fn unnormalize_mse<B: Backend, const D: usize>(&self, mse: Tensor<B, D>) -> Tensor<B, D> {
        let device = mse.device();
        let var = broadcast_coords::<B, D>([self.std[0].powi(2), self.std[1].powi(2)], &device);
        mse * var
    }
}

/// A `[1, .., 1, 2]` tensor holding `coords`, broadcastable over any leading axes.
fn broadcast_coords<B: Backend, const D: usize>(coords: [f32; 2], device: &B::Device) -> Tensor<B, D> {
    let mut shape = [1usize; D];
    shape[D - 1] = 2;
    Tensor::from_data(TensorData::new(coords.to_vec(), shape), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mean_maps_to_zero() {
        let device = Default::default();
        let norm = Normalizer::default();
        let loc = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![31.5863, 32.0618, 47.6888, 48.1971], [1, 2, 2]),
            &device,
        );
        let values: Vec<f32> = norm.normalize_location(loc).into_data().to_vec().unwrap();
        assert!(values[0].abs() < 1e-5 && values[1].abs() < 1e-5);
        assert!((values[2] - 1.0).abs() < 1e-4 && (values[3] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_unnormalize_mse_scales_by_variance() {
        let device = Default::default();
        let norm = Normalizer::default();
        let mse = Tensor::<TestBackend, 2>::ones([3, 2], &device);
        let values: Vec<f32> = norm.unnormalize_mse(mse).into_data().to_vec().unwrap();
        assert!((values[0] - 16.1025_f32.powi(2)).abs() < 1e-2);
        assert!((values[1] - 16.1353_f32.powi(2)).abs() < 1e-2);
        assert!((values[4] - 16.1025_f32.powi(2)).abs() < 1e-2);
    }
}
