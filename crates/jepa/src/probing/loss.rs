//! Location regression losses.

use burn::prelude::*;

/// Squared error between predicted and target locations, averaged over the
/// batch.
///
/// # Arguments
/// - `pred`: shape `(batch, T, 2)`
/// - `target`: shape `(batch, T, 2)`
///
/// # Returns
/// Per-timestep, per-coordinate error of shape `(T, 2)`.
pub fn location_losses<B: Backend>(pred: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 2> {
    assert_eq!(
        pred.dims(),
        target.dims(),
        "prediction and target shapes differ"
    );
    let [_, steps, coords] = pred.dims();
    (pred - target)
        .powf_scalar(2.0)
        .mean_dim(0)
        .reshape([steps, coords])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_zero_for_exact_prediction() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::ones([4, 3, 2], &device);
        let loss = location_losses(x.clone(), x);
        assert_eq!(loss.dims(), [3, 2]);
        let total: f32 = loss.sum().into_scalar().elem();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_mean_over_batch() {
        let device = Default::default();
        // Two samples, one step: errors (1, 2) and (3, 0).
        let pred = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![1.0_f32, 2.0, 3.0, 0.0], [2, 1, 2]),
            &device,
        );
        let target = Tensor::<TestBackend, 3>::zeros([2, 1, 2], &device);
        let values: Vec<f32> = location_losses(pred, target).into_data().to_vec().unwrap();
        assert_eq!(values, vec![5.0, 2.0]);
    }
}
