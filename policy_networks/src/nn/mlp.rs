//! Feature-extraction stack: optional convolutions followed by dense layers.
//!
//! # Layout
//!
//! ```text
//! image obs [N, H, W, C] -> permute [N, C, H, W] -> (conv + act)* -> flatten -> (dense + act)* -> [N, F]
//! vector obs [N, F0]     ------------------------------------------------> (dense + act)* -> [N, F]
//! ```
//!
//! Every kernel is Glorot-uniform initialized and every bias starts at zero.
//! Convolutions use valid
//! padding, so each one shrinks the spatial size to `(size - kernel) / stride + 1`.

use burn::module::{Ignored, Param};
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Initializer, Linear, LinearConfig, PaddingConfig2d};
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::activation::Activation;
use crate::error::{NetworkError, Result};

/// Parameters of one convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvLayerParams {
    /// Number of output channels.
    pub filters: usize,
    /// Square kernel size.
    pub kernel_size: usize,
    /// Stride in both spatial directions.
    pub stride: usize,
}

impl ConvLayerParams {
    pub fn new(filters: usize, kernel_size: usize, stride: usize) -> Self {
        Self {
            filters,
            kernel_size,
            stride,
        }
    }
}

impl From<(usize, usize, usize)> for ConvLayerParams {
    fn from((filters, kernel_size, stride): (usize, usize, usize)) -> Self {
        Self::new(filters, kernel_size, stride)
    }
}

/// Configuration for [`MlpLayers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpLayersConfig {
    /// Convolutions applied first, if any.
    pub conv_layer_params: Option<Vec<ConvLayerParams>>,
    /// Units of each dense layer.
    pub fc_layer_params: Vec<usize>,
    /// Activation after every layer.
    pub activation: Activation,
}

impl MlpLayersConfig {
    /// Dense-only stack with ReLU activations.
    pub fn new(fc_layer_params: impl Into<Vec<usize>>) -> Self {
        Self {
            conv_layer_params: None,
            fc_layer_params: fc_layer_params.into(),
            activation: Activation::Relu,
        }
    }

    /// Set the convolution layers.
    pub fn with_conv_layer_params(mut self, params: Option<Vec<ConvLayerParams>>) -> Self {
        self.conv_layer_params = params;
        self
    }

    /// Set the activation.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Build the stack for observations of shape `input_shape` (one example).
    ///
    /// Convolutions require a `[H, W, C]` observation.
    pub fn init<B: Backend>(&self, input_shape: &[usize], device: &B::Device) -> Result<MlpLayers<B>> {
        let conv_params = self.conv_layer_params.as_deref().unwrap_or(&[]);
        let mut conv_layers = Vec::with_capacity(conv_params.len());

        let mut features = if conv_params.is_empty() {
            input_shape.iter().product()
        } else {
            let [height, width, channels] = match input_shape {
                &[h, w, c] => [h, w, c],
                _ => {
                    return Err(NetworkError::unsupported(format!(
                        "convolution layers need a [height, width, channels] observation, got {:?}",
                        input_shape
                    )))
                }
            };
            let (mut h, mut w, mut c) = (height, width, channels);
            for params in conv_params {
                if params.kernel_size == 0 || params.stride == 0 || params.filters == 0 {
                    return Err(NetworkError::unsupported(format!(
                        "invalid convolution parameters {:?}",
                        params
                    )));
                }
                if h < params.kernel_size || w < params.kernel_size {
                    return Err(NetworkError::unsupported(format!(
                        "kernel {} does not fit a {}x{} input",
                        params.kernel_size, h, w
                    )));
                }
                let mut conv = Conv2dConfig::new(
                    [c, params.filters],
                    [params.kernel_size, params.kernel_size],
                )
                .with_stride([params.stride, params.stride])
                .with_padding(PaddingConfig2d::Valid)
                .with_initializer(glorot_uniform())
                .init(device);
                conv.bias = zero_bias(conv.bias, params.filters, device);
                conv_layers.push(conv);
                h = (h - params.kernel_size) / params.stride + 1;
                w = (w - params.kernel_size) / params.stride + 1;
                c = params.filters;
            }
            h * w * c
        };

        let mut fc_layers = Vec::with_capacity(self.fc_layer_params.len());
        for &units in &self.fc_layer_params {
            let mut linear = LinearConfig::new(features, units)
                .with_initializer(glorot_uniform())
                .init(device);
            linear.bias = zero_bias(linear.bias, units, device);
            fc_layers.push(linear);
            features = units;
        }

        Ok(MlpLayers {
            conv_layers,
            fc_layers,
            activation: Ignored(self.activation),
            output_size: features,
        })
    }
}

impl Default for MlpLayersConfig {
    fn default() -> Self {
        Self::new([200, 100])
    }
}

fn glorot_uniform() -> Initializer {
    Initializer::XavierUniform { gain: 1.0 }
}

/// The initializer only targets kernels; biases start at zero.
fn zero_bias<B: Backend>(
    bias: Option<Param<Tensor<B, 1>>>,
    size: usize,
    device: &B::Device,
) -> Option<Param<Tensor<B, 1>>> {
    bias.map(|_| Param::from_tensor(Tensor::zeros([size], device)))
}

/// The built feature-extraction stack.
#[derive(Module, Debug)]
pub struct MlpLayers<B: Backend> {
    conv_layers: Vec<Conv2d<B>>,
    fc_layers: Vec<Linear<B>>,
    activation: Ignored<Activation>,
    output_size: usize,
}

impl<B: Backend> MlpLayers<B> {
    /// True when the stack starts with convolutions and expects images.
    pub fn has_conv(&self) -> bool {
        !self.conv_layers.is_empty()
    }

    pub fn num_conv_layers(&self) -> usize {
        self.conv_layers.len()
    }

    pub fn num_fc_layers(&self) -> usize {
        self.fc_layers.len()
    }

    /// Size of the produced feature vector.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn activation(&self) -> Activation {
        self.activation.0
    }

    /// Run the dense layers on `[N, F0]` inputs.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.fc_layers
            .iter()
            .fold(x, |x, layer| self.activation.0.apply(layer.forward(x)))
    }

    /// Run the full stack on channels-last `[N, H, W, C]` images.
    pub fn forward_images(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = images.permute([0, 3, 1, 2]);
        let x = self
            .conv_layers
            .iter()
            .fold(x, |x, layer| self.activation.0.apply(layer.forward(x)));
        let x: Tensor<B, 2> = x.flatten(1, 3);
        self.forward(x)
    }
}
