//! Initialization helpers for projection layers.
//!
//! Projection heads start close to zero so the initial policy is nearly
//! uniform (categorical) or centered in the action range (Gaussian).
//! Their kernels use fan-in variance scaling:
//!
//! ```text
//! W ~ N(0, sqrt(scale / fan_in)),  b = 0
//! ```
//!
//! With `scale = 1` this is LeCun-normal; the projection heads use
//! `scale = 0.1`.

use burn::module::Param;
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;

/// Kernel initializer with fan-in variance scaling.
pub fn variance_scaling(scale: f64, fan_in: usize) -> Initializer {
    Initializer::Normal {
        mean: 0.0,
        std: (scale / fan_in.max(1) as f64).sqrt(),
    }
}

/// Dense layer with a variance-scaled kernel and a constant bias.
pub fn variance_scaling_linear<B: Backend>(
    d_input: usize,
    d_output: usize,
    scale: f64,
    bias_value: f32,
    device: &B::Device,
) -> Linear<B> {
    let mut linear = LinearConfig::new(d_input, d_output)
        .with_initializer(variance_scaling(scale, d_input))
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::full([d_output], bias_value, device)));
    linear
}

/// Inverse of `softplus(x) = ln(1 + e^x)`.
///
/// Used to pick the pre-activation value that yields a given initial
/// standard deviation.
pub fn inverse_softplus(y: f64) -> f64 {
    y.exp_m1().ln()
}
