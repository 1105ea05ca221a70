//! Activation functions applied between feature layers.

use burn::prelude::*;
use burn::tensor::activation::{gelu, leaky_relu, relu, sigmoid, tanh};
use serde::{Deserialize, Serialize};

/// Element-wise activation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
    LeakyRelu {
        negative_slope: f64,
    },
    Gelu,
    /// No activation.
    Identity,
}

impl Activation {
    /// Apply the activation to a tensor of any rank.
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match *self {
            Activation::Relu => relu(x),
            Activation::Tanh => tanh(x),
            Activation::Sigmoid => sigmoid(x),
            Activation::LeakyRelu { negative_slope } => leaky_relu(x, negative_slope),
            Activation::Gelu => gelu(x),
            Activation::Identity => x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn apply(activation: Activation, values: [f32; 3]) -> Vec<f32> {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats(values, &device);
        activation.apply(x).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_relu_clips_negatives() {
        assert_eq!(apply(Activation::Relu, [-1.0, 0.0, 2.0]), vec![0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_leaky_relu_scales_negatives() {
        let out = apply(Activation::LeakyRelu { negative_slope: 0.1 }, [-2.0, 0.0, 3.0]);
        assert!((out[0] + 0.2).abs() < 1e-6);
        assert_eq!(out[2], 3.0);
    }

    #[test]
    fn test_tanh_is_bounded() {
        let out = apply(Activation::Tanh, [-100.0, 0.0, 100.0]);
        assert!(out.iter().all(|v| v.abs() <= 1.0));
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_identity_passthrough() {
        assert_eq!(apply(Activation::Identity, [-1.5, 0.5, 9.0]), vec![-1.5, 0.5, 9.0]);
    }

    #[test]
    fn test_default_is_relu() {
        assert_eq!(Activation::default(), Activation::Relu);
    }
}
