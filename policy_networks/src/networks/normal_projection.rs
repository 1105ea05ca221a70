//! Projection from hidden features to a Gaussian over continuous actions.
//!
//! ```text
//! means = mid + half_range * tanh(W_m h + b_m)          (TanhSquashToSpec)
//! std   = softplus(b_s)                                  (state-independent)
//! std   = softplus(W_s h + b_s)                          (state-dependent)
//! ```
//!
//! `b_s` starts at `inverse_softplus(init_action_stddev)` so the initial
//! standard deviation is `init_action_stddev` everywhere.

use burn::module::{Ignored, Param};
use burn::nn::Linear;
use burn::prelude::*;
use burn::tensor::activation::{softplus, tanh};
use serde::{Deserialize, Serialize};

use crate::distributions::Normal;
use crate::error::{NetworkError, Result};
use crate::nn::init::{inverse_softplus, variance_scaling_linear};
use crate::nn::squash::{BatchSquash, OuterBatch};
use crate::specs::{BoundedTensorSpec, DistributionKind, DistributionSpec, TensorSpec};

/// How raw mean outputs are mapped into action space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MeanTransform {
    /// Squash into `[minimum, maximum]` with tanh.
    #[default]
    TanhSquashToSpec,
    /// Leave the means unbounded.
    Identity,
}

/// Configuration for [`NormalProjectionNetwork`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalProjectionNetworkConfig {
    /// Variance-scaling factor of the mean (and std) kernels.
    /// Default: 0.1
    pub init_means_output_factor: f64,
    /// Pre-softplus value of the std bias.
    /// Default: inverse_softplus(0.35)
    pub std_initializer_value: f64,
    /// Mean transform. Default: tanh squash into the action bounds.
    pub mean_transform: MeanTransform,
    /// Whether the std is computed from the features.
    /// Default: false (one learned std per action element)
    pub state_dependent_std: bool,
}

impl Default for NormalProjectionNetworkConfig {
    fn default() -> Self {
        Self {
            init_means_output_factor: 0.1,
            std_initializer_value: inverse_softplus(0.35),
            mean_transform: MeanTransform::TanhSquashToSpec,
            state_dependent_std: false,
        }
    }
}

impl NormalProjectionNetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mean kernel scale.
    pub fn with_init_means_output_factor(mut self, factor: f64) -> Self {
        self.init_means_output_factor = factor;
        self
    }

    /// Set the initial standard deviation (must be positive).
    pub fn with_init_action_stddev(mut self, stddev: f64) -> Self {
        self.std_initializer_value = inverse_softplus(stddev);
        self
    }

    /// Set the raw pre-softplus std bias.
    pub fn with_std_initializer_value(mut self, value: f64) -> Self {
        self.std_initializer_value = value;
        self
    }

    pub fn with_mean_transform(mut self, transform: MeanTransform) -> Self {
        self.mean_transform = transform;
        self
    }

    pub fn with_state_dependent_std(mut self, state_dependent: bool) -> Self {
        self.state_dependent_std = state_dependent;
        self
    }

    /// Build the projection for one continuous action leaf.
    pub fn init<B: Backend>(
        &self,
        sample_spec: &BoundedTensorSpec,
        input_size: usize,
        device: &B::Device,
    ) -> Result<NormalProjectionNetwork<B>> {
        sample_spec.validate()?;
        if sample_spec.is_discrete() {
            return Err(NetworkError::invalid_spec(format!(
                "normal projection needs a continuous spec, got {:?}",
                sample_spec.dtype
            )));
        }
        if !self.std_initializer_value.is_finite() {
            return Err(NetworkError::invalid_spec(format!(
                "std initializer value must be finite, got {}",
                self.std_initializer_value
            )));
        }

        let elements = sample_spec.num_elements();
        let std_init = self.std_initializer_value as f32;

        let means_projection_layer = variance_scaling_linear(
            input_size,
            elements,
            self.init_means_output_factor,
            0.0,
            device,
        );
        let (stddev_projection_layer, stddev_bias) = if self.state_dependent_std {
            let layer = variance_scaling_linear(
                input_size,
                elements,
                self.init_means_output_factor,
                std_init,
                device,
            );
            (Some(layer), None)
        } else {
            let bias = Param::from_tensor(Tensor::full([elements], std_init, device));
            (None, Some(bias))
        };

        let minimum = sample_spec.minimum_values();
        let maximum = sample_spec.maximum_values();
        let action_means = minimum
            .iter()
            .zip(&maximum)
            .map(|(lo, hi)| ((hi + lo) / 2.0) as f32)
            .collect();
        let action_magnitudes = minimum
            .iter()
            .zip(&maximum)
            .map(|(lo, hi)| ((hi - lo) / 2.0) as f32)
            .collect();

        let output_spec = DistributionSpec::new(
            DistributionKind::Normal,
            sample_spec.clone(),
            [
                ("loc", TensorSpec::float(sample_spec.shape.clone())),
                ("scale", TensorSpec::float(sample_spec.shape.clone())),
            ],
        );

        Ok(NormalProjectionNetwork {
            means_projection_layer,
            stddev_projection_layer,
            stddev_bias,
            action_means: Ignored(action_means),
            action_magnitudes: Ignored(action_magnitudes),
            mean_transform: Ignored(self.mean_transform),
            output_spec: Ignored(output_spec),
        })
    }
}

/// Dense heads producing per-element means and standard deviations.
#[derive(Module, Debug)]
pub struct NormalProjectionNetwork<B: Backend> {
    means_projection_layer: Linear<B>,
    stddev_projection_layer: Option<Linear<B>>,
    /// Pre-softplus std, shape [elements]
    stddev_bias: Option<Param<Tensor<B, 1>>>,
    action_means: Ignored<Vec<f32>>,
    action_magnitudes: Ignored<Vec<f32>>,
    mean_transform: Ignored<MeanTransform>,
    output_spec: Ignored<DistributionSpec>,
}

impl<B: Backend> NormalProjectionNetwork<B> {
    pub fn output_spec(&self) -> &DistributionSpec {
        &self.output_spec.0
    }

    pub fn sample_spec(&self) -> &BoundedTensorSpec {
        &self.output_spec.0.sample_spec
    }

    pub fn is_state_dependent_std(&self) -> bool {
        self.stddev_projection_layer.is_some()
    }

    /// Map `[outer.., F]` features to a Normal over `[outer.., action_shape..]`.
    pub fn forward(&self, inputs: &OuterBatch<B>, outer_rank: usize) -> Result<Normal<B>> {
        let mut squash = BatchSquash::new(outer_rank);
        let features = squash.flatten_batch(inputs.clone())?;
        let [n, _] = features.dims();
        let device = features.device();

        let means = self.means_projection_layer.forward(features.clone());
        let means = match self.mean_transform.0 {
            MeanTransform::TanhSquashToSpec => scale_to_spec(
                tanh(means),
                &self.action_means.0,
                &self.action_magnitudes.0,
                &device,
            ),
            MeanTransform::Identity => means,
        };

        let stddevs = match (&self.stddev_projection_layer, &self.stddev_bias) {
            (Some(layer), _) => layer.forward(features),
            (None, Some(bias)) => bias.val().unsqueeze_dim(0).repeat_dim(0, n),
            (None, None) => {
                return Err(NetworkError::unsupported(
                    "normal projection has neither a std layer nor a std bias",
                ))
            }
        };
        let stddevs = softplus(stddevs, 1.0);

        let mut batch_shape = inputs.outer_shape().to_vec();
        batch_shape.extend_from_slice(&self.sample_spec().shape);
        Normal::new(means, stddevs, batch_shape)
    }
}

/// Map `[-1, 1]` values to `mid + half_range * x` per action element.
fn scale_to_spec<B: Backend>(
    squashed: Tensor<B, 2>,
    mid: &[f32],
    half_range: &[f32],
    device: &B::Device,
) -> Tensor<B, 2> {
    let mid: Tensor<B, 2> = Tensor::<B, 1>::from_floats(mid, device).unsqueeze_dim(0);
    let half_range: Tensor<B, 2> = Tensor::<B, 1>::from_floats(half_range, device).unsqueeze_dim(0);

    // Broadcast: [1, elements] * [batch_size, elements]
    squashed * half_range + mid
}
