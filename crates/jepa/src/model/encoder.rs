use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;

/// Configuration for the frame encoder.
///
/// ```text
/// (batch, channels, H, W)
///   → Conv2d(channels→base, 4x4, stride 2) → ReLU
///   → Conv2d(base→2*base, 4x4, stride 2) → ReLU
///   → AdaptiveAvgPool(1x1) → flatten
///   → Linear(2*base→repr_dim)
///   → repr: (batch, repr_dim)
/// ```
#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Number of observation channels (agent, wall).
    pub in_channels: usize,
    /// Output representation dimension.
    pub repr_dim: usize,
    /// Channels of the first convolution; the second uses twice as many.
    #[config(default = 16)]
    pub base_channels: usize,
}

/// Convolutional encoder mapping a single frame to a representation vector.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub(crate) conv1: Conv2d<B>,
    pub(crate) conv2: Conv2d<B>,
    pool: AdaptiveAvgPool2d,
    pub(crate) proj: Linear<B>,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let c1 = self.base_channels;
        let c2 = self.base_channels * 2;
        Encoder {
            conv1: Conv2dConfig::new([self.in_channels, c1], [4, 4])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            conv2: Conv2dConfig::new([c1, c2], [4, 4])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            proj: LinearConfig::new(c2, self.repr_dim).init(device),
        }
    }
}

impl<B: Backend> Encoder<B> {
    /// Input shape: `(batch, channels, height, width)`
    /// Output shape: `(batch, repr_dim)`
    pub fn forward(&self, frames: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = burn::tensor::activation::relu(self.conv1.forward(frames));
        let x = burn::tensor::activation::relu(self.conv2.forward(x));
        let x: Tensor<B, 2> = self.pool.forward(x).flatten(1, 3);
        self.proj.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let encoder = EncoderConfig::new(2, 32).init::<TestBackend>(&device);
        let frames = Tensor::<TestBackend, 4>::random(
            [3, 2, 65, 65],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        assert_eq!(encoder.forward(frames).dims(), [3, 32]);
    }

    #[test]
    fn test_small_frames() {
        // Adaptive pooling makes the encoder independent of frame size.
        let device = Default::default();
        let encoder = EncoderConfig::new(2, 8)
            .with_base_channels(4)
            .init::<TestBackend>(&device);
        let frames = Tensor::<TestBackend, 4>::zeros([2, 2, 8, 8], &device);
        assert_eq!(encoder.forward(frames).dims(), [2, 8]);
    }

    #[test]
    fn test_deterministic() {
        let device = Default::default();
        let encoder = EncoderConfig::new(2, 16)
            .with_base_channels(4)
            .init::<TestBackend>(&device);
        let frames = Tensor::<TestBackend, 4>::random(
            [2, 2, 12, 12],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        let a = encoder.forward(frames.clone());
        let b = encoder.forward(frames);
        let diff: f32 = (a - b).abs().max().into_scalar().elem();
        assert_eq!(diff, 0.0);
    }
}
