use burn::prelude::*;

use crate::model::encoder::{Encoder, EncoderConfig};
use crate::model::predictor::{Predictor, PredictorConfig};

/// Configuration for the JEPA representation model.
///
/// The encoder embeds the first observation; the predictor then rolls the
/// representation forward once per action, never looking at later frames.
#[derive(Config, Debug)]
pub struct JepaConfig {
    /// Representation dimension produced by encoder and predictor.
    pub repr_dim: usize,
    /// Dimension of each action vector.
    pub action_dim: usize,
    /// Observation channels (agent, wall).
    #[config(default = 2)]
    pub in_channels: usize,
    /// Channels of the first encoder convolution.
    #[config(default = 16)]
    pub base_channels: usize,
    /// Hidden width of the predictor MLP.
    #[config(default = 512)]
    pub predictor_hidden: usize,
    /// Predictor dropout; inactive once the model is in evaluation mode.
    #[config(default = 0.1)]
    pub dropout: f64,
}

/// Joint-embedding predictive model: frame encoder + latent predictor.
#[derive(Module, Debug)]
pub struct JepaModel<B: Backend> {
    pub(crate) encoder: Encoder<B>,
    pub(crate) predictor: Predictor<B>,
}

impl JepaConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> JepaModel<B> {
        JepaModel {
            encoder: EncoderConfig::new(self.in_channels, self.repr_dim)
                .with_base_channels(self.base_channels)
                .init(device),
            predictor: PredictorConfig::new(self.repr_dim, self.action_dim)
                .with_hidden(self.predictor_hidden)
                .with_dropout(self.dropout)
                .init(device),
        }
    }

    /// Parameter shapes a model built from this config must have, keyed by
    /// the same names as [`JepaModel::weight_shapes`].
    pub fn expected_weight_shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        let c1 = self.base_channels;
        let c2 = self.base_channels * 2;
        vec![
            ("encoder.conv1.weight", vec![c1, self.in_channels, 4, 4]),
            ("encoder.conv2.weight", vec![c2, c1, 4, 4]),
            ("encoder.proj.weight", vec![c2, self.repr_dim]),
            (
                "predictor.fc1.weight",
                vec![self.repr_dim + self.action_dim, self.predictor_hidden],
            ),
            ("predictor.fc2.weight", vec![self.predictor_hidden, self.repr_dim]),
        ]
    }
}

impl<B: Backend> JepaModel<B> {
    /// Encode the first frame and unroll the predictor over every action.
    ///
    /// Input shapes: `states (batch, T, C, H, W)`, `actions (batch, T-1, A)`
    /// Output shape: `(batch, T, repr_dim)`; index 0 is the encoding of the
    /// first frame, index `t` the prediction after `t` actions.
    ///
    /// Only the first frame of `states` is read, so callers may pass either
    /// the full episode or just `states[:, 0:1]`.
    pub fn forward(&self, states: Tensor<B, 5>, actions: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, _, channels, height, width] = states.dims();
        let [_, n_actions, action_dim] = actions.dims();

        let first: Tensor<B, 4> = states
            .slice([0..batch, 0..1, 0..channels, 0..height, 0..width])
            .reshape([batch, channels, height, width]);

        let mut repr = self.encoder.forward(first);
        let mut steps = Vec::with_capacity(n_actions + 1);
        steps.push(repr.clone());

        for t in 0..n_actions {
            let action: Tensor<B, 2> = actions
                .clone()
                .slice([0..batch, t..t + 1, 0..action_dim])
                .reshape([batch, action_dim]);
            repr = self.predictor.forward(repr, action);
            steps.push(repr.clone());
        }

        Tensor::stack(steps, 1)
    }

    /// Encode frames independently, without the predictor.
    ///
    /// Input shape: `(batch, C, H, W)`; output `(batch, repr_dim)`.
    pub fn encode(&self, frames: Tensor<B, 4>) -> Tensor<B, 2> {
        self.encoder.forward(frames)
    }

    /// Representation dimension implied by the loaded weights.
    pub fn repr_dim(&self) -> usize {
        self.encoder.proj.weight.val().dims()[1]
    }

    /// Action dimension implied by the loaded weights.
    pub fn action_dim(&self) -> usize {
        let [fc1_in, _] = self.predictor.fc1.weight.val().dims();
        fc1_in.saturating_sub(self.repr_dim())
    }

    /// Actual parameter shapes, keyed like [`JepaConfig::expected_weight_shapes`].
    pub fn weight_shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        vec![
            ("encoder.conv1.weight", self.encoder.conv1.weight.val().dims().to_vec()),
            ("encoder.conv2.weight", self.encoder.conv2.weight.val().dims().to_vec()),
            ("encoder.proj.weight", self.encoder.proj.weight.val().dims().to_vec()),
            ("predictor.fc1.weight", self.predictor.fc1.weight.val().dims().to_vec()),
            ("predictor.fc2.weight", self.predictor.fc2.weight.val().dims().to_vec()),
        ]
    }
}
