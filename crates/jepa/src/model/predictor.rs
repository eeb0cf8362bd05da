use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::*;

/// Configuration for the action-conditioned latent predictor.
///
/// ```text
/// cat(repr, action): (batch, repr_dim + action_dim)
///   → Linear(→hidden) → ReLU → Dropout
///   → Linear(hidden→repr_dim)
///   → next repr: (batch, repr_dim)
/// ```
#[derive(Config, Debug)]
pub struct PredictorConfig {
    pub repr_dim: usize,
    pub action_dim: usize,
    #[config(default = 512)]
    pub hidden: usize,
    /// Dropout probability; only active on an autodiff backend.
    #[config(default = 0.1)]
    pub dropout: f64,
}

/// Predicts the next representation from the current one and an action.
#[derive(Module, Debug)]
pub struct Predictor<B: Backend> {
    pub(crate) fc1: Linear<B>,
    dropout: Dropout,
    pub(crate) fc2: Linear<B>,
}

impl PredictorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Predictor<B> {
        Predictor {
            fc1: LinearConfig::new(self.repr_dim + self.action_dim, self.hidden).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc2: LinearConfig::new(self.hidden, self.repr_dim).init(device),
        }
    }
}

impl<B: Backend> Predictor<B> {
    /// Input shapes: `repr (batch, repr_dim)`, `action (batch, action_dim)`
    /// Output shape: `(batch, repr_dim)`
    pub fn forward(&self, repr: Tensor<B, 2>, action: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = Tensor::cat(vec![repr, action], 1);
        let x = burn::tensor::activation::relu(self.fc1.forward(x));
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }
}
