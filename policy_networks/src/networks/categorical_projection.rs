//! Projection from hidden features to categorical logits.

use burn::module::Ignored;
use burn::nn::Linear;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distributions::Categorical;
use crate::error::{NetworkError, Result};
use crate::nn::init::variance_scaling_linear;
use crate::nn::squash::{BatchSquash, OuterBatch};
use crate::specs::{BoundedTensorSpec, DistributionKind, DistributionSpec, TensorSpec};

/// Configuration for [`CategoricalProjectionNetwork`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalProjectionNetworkConfig {
    /// Variance-scaling factor of the logits kernel.
    /// Default: 0.1 (near-uniform initial policy)
    pub logits_init_output_factor: f64,
}

impl Default for CategoricalProjectionNetworkConfig {
    fn default() -> Self {
        Self {
            logits_init_output_factor: 0.1,
        }
    }
}

impl CategoricalProjectionNetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logits kernel scale.
    pub fn with_logits_init_output_factor(mut self, factor: f64) -> Self {
        self.logits_init_output_factor = factor;
        self
    }

    /// Build the projection for one discrete action leaf.
    ///
    /// Every element of the leaf must span the same number of actions.
    pub fn init<B: Backend>(
        &self,
        sample_spec: &BoundedTensorSpec,
        input_size: usize,
        device: &B::Device,
    ) -> Result<CategoricalProjectionNetwork<B>> {
        sample_spec.validate()?;
        if !sample_spec.is_discrete() {
            return Err(NetworkError::invalid_spec(format!(
                "categorical projection needs a discrete spec, got {:?}",
                sample_spec.dtype
            )));
        }
        let num_actions = uniform_num_actions(sample_spec)?;

        let mut logits_shape = sample_spec.shape.clone();
        logits_shape.push(num_actions);
        let output_spec = DistributionSpec::new(
            DistributionKind::Categorical,
            sample_spec.clone(),
            [("logits", TensorSpec::float(logits_shape))],
        );

        let projection_layer = variance_scaling_linear(
            input_size,
            sample_spec.num_elements() * num_actions,
            self.logits_init_output_factor,
            0.0,
            device,
        );

        Ok(CategoricalProjectionNetwork {
            projection_layer,
            num_actions,
            output_spec: Ignored(output_spec),
        })
    }
}

/// `maximum - minimum + 1`, which must agree across all elements.
fn uniform_num_actions(spec: &BoundedTensorSpec) -> Result<usize> {
    let mut counts = spec
        .minimum_values()
        .into_iter()
        .zip(spec.maximum_values())
        .map(|(lo, hi)| (hi - lo).round() as usize + 1);
    let first = counts
        .next()
        .ok_or_else(|| NetworkError::invalid_spec("discrete spec has no elements"))?;
    if counts.any(|n| n != first) {
        return Err(NetworkError::invalid_spec(
            "bounds on discrete actions must be the same for all dimensions",
        ));
    }
    Ok(first)
}

/// Dense layer producing logits for every action element.
#[derive(Module, Debug)]
pub struct CategoricalProjectionNetwork<B: Backend> {
    projection_layer: Linear<B>,
    num_actions: usize,
    output_spec: Ignored<DistributionSpec>,
}

impl<B: Backend> CategoricalProjectionNetwork<B> {
    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn output_spec(&self) -> &DistributionSpec {
        &self.output_spec.0
    }

    pub fn sample_spec(&self) -> &BoundedTensorSpec {
        &self.output_spec.0.sample_spec
    }

    /// Map `[outer.., F]` features to a categorical over `[outer.., action_shape..]`.
    pub fn forward(&self, inputs: &OuterBatch<B>, outer_rank: usize) -> Result<Categorical<B>> {
        let mut squash = BatchSquash::new(outer_rank);
        let features = squash.flatten_batch(inputs.clone())?;
        let [n, _] = features.dims();

        let logits = self.projection_layer.forward(features);
        let elements = self.sample_spec().num_elements();
        let logits = logits.reshape([n * elements, self.num_actions]);

        let mut batch_shape = inputs.outer_shape().to_vec();
        batch_shape.extend_from_slice(&self.sample_spec().shape);
        Categorical::new(logits, batch_shape)
    }
}
