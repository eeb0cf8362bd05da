use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// Configuration for the location prober.
///
/// `arch` lists hidden layer widths separated by `-` (e.g. `"512-256"`);
/// an empty string yields a single linear map.
#[derive(Config, Debug)]
pub struct ProberConfig {
    /// Input (representation) dimension.
    pub embedding: usize,
    /// Output dimension, 2 for `(x, y)` locations.
    pub output_dim: usize,
    #[config(default = "String::from(\"256\")")]
    pub arch: String,
}

/// Parse a `-`-separated list of hidden widths.
pub fn parse_arch(arch: &str) -> anyhow::Result<Vec<usize>> {
    let arch = arch.trim();
    if arch.is_empty() {
        return Ok(Vec::new());
    }
    arch.split('-')
        .map(|part| {
            let width: usize = part
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid prober layer width {part:?} in {arch:?}: {e}"))?;
            if width == 0 {
                anyhow::bail!("Prober layer width must be positive in {arch:?}");
            }
            Ok(width)
        })
        .collect()
}

/// MLP regressor from representations to locations.
#[derive(Module, Debug)]
pub struct Prober<B: Backend> {
    layers: Vec<Linear<B>>,
}

impl ProberConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> anyhow::Result<Prober<B>> {
        let mut widths = vec![self.embedding];
        widths.extend(parse_arch(&self.arch)?);
        widths.push(self.output_dim);

        let layers = widths
            .windows(2)
            .map(|w| LinearConfig::new(w[0], w[1]).init(device))
            .collect();
        Ok(Prober { layers })
    }
}

impl<B: Backend> Prober<B> {
    /// Input shape: `(batch, embedding)`
    /// Output shape: `(batch, output_dim)`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len() - 1;
        let mut x = x;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = burn::tensor::activation::relu(x);
            }
        }
        x
    }

    /// Apply the prober at every timestep.
    ///
    /// Input shape: `(batch, T, embedding)`; output `(batch, T, output_dim)`.
    pub fn forward_sequence(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, steps, dim] = x.dims();
        let out = self.forward(x.reshape([batch * steps, dim]));
        let [_, out_dim] = out.dims();
        out.reshape([batch, steps, out_dim])
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}
