//! Projection sub-networks: hidden features to one action distribution.
//!
//! The actor network owns one [`ProjectionNetwork`] per action leaf. Which
//! variant a leaf gets is decided at construction by the injected factory for
//! discrete or continuous leaves; the defaults are
//! [`default_discrete_projection`] and [`default_continuous_projection`].

use burn::prelude::*;

use super::categorical_projection::{CategoricalProjectionNetwork, CategoricalProjectionNetworkConfig};
use super::normal_projection::{NormalProjectionNetwork, NormalProjectionNetworkConfig};
use crate::distributions::ActionDistribution;
use crate::error::Result;
use crate::nn::squash::OuterBatch;
use crate::specs::{BoundedTensorSpec, DistributionSpec};

/// A projection head for one action leaf.
#[derive(Module, Debug)]
pub enum ProjectionNetwork<B: Backend> {
    Categorical(CategoricalProjectionNetwork<B>),
    Normal(NormalProjectionNetwork<B>),
}

impl<B: Backend> ProjectionNetwork<B> {
    /// Spec of the distribution this head produces.
    pub fn output_spec(&self) -> &DistributionSpec {
        match self {
            ProjectionNetwork::Categorical(net) => net.output_spec(),
            ProjectionNetwork::Normal(net) => net.output_spec(),
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, ProjectionNetwork::Categorical(_))
    }

    /// Project `[outer.., F]` features; `outer_rank` lets the head squash and restore them.
    pub fn forward(&self, inputs: &OuterBatch<B>, outer_rank: usize) -> Result<ActionDistribution<B>> {
        match self {
            ProjectionNetwork::Categorical(net) => net.forward(inputs, outer_rank).map(Into::into),
            ProjectionNetwork::Normal(net) => net.forward(inputs, outer_rank).map(Into::into),
        }
    }
}

impl<B: Backend> From<CategoricalProjectionNetwork<B>> for ProjectionNetwork<B> {
    fn from(net: CategoricalProjectionNetwork<B>) -> Self {
        ProjectionNetwork::Categorical(net)
    }
}

impl<B: Backend> From<NormalProjectionNetwork<B>> for ProjectionNetwork<B> {
    fn from(net: NormalProjectionNetwork<B>) -> Self {
        ProjectionNetwork::Normal(net)
    }
}

/// Builds the projection head for one action leaf.
///
/// Called with the leaf spec, the hidden feature size and the device.
pub trait ProjectionFactory<B: Backend> {
    fn build(
        &self,
        sample_spec: &BoundedTensorSpec,
        input_size: usize,
        device: &B::Device,
    ) -> Result<ProjectionNetwork<B>>;
}

impl<B, F> ProjectionFactory<B> for F
where
    B: Backend,
    F: Fn(&BoundedTensorSpec, usize, &B::Device) -> Result<ProjectionNetwork<B>>,
{
    fn build(
        &self,
        sample_spec: &BoundedTensorSpec,
        input_size: usize,
        device: &B::Device,
    ) -> Result<ProjectionNetwork<B>> {
        self(sample_spec, input_size, device)
    }
}

impl<B: Backend> ProjectionFactory<B> for CategoricalProjectionNetworkConfig {
    fn build(
        &self,
        sample_spec: &BoundedTensorSpec,
        input_size: usize,
        device: &B::Device,
    ) -> Result<ProjectionNetwork<B>> {
        self.init(sample_spec, input_size, device).map(Into::into)
    }
}

impl<B: Backend> ProjectionFactory<B> for NormalProjectionNetworkConfig {
    fn build(
        &self,
        sample_spec: &BoundedTensorSpec,
        input_size: usize,
        device: &B::Device,
    ) -> Result<ProjectionNetwork<B>> {
        self.init(sample_spec, input_size, device).map(Into::into)
    }
}

/// Categorical head with `logits_init_output_factor = 0.1`.
pub fn default_discrete_projection() -> CategoricalProjectionNetworkConfig {
    CategoricalProjectionNetworkConfig::default()
}

/// Normal head with an initial std of 0.35 and `init_means_output_factor = 0.1`.
pub fn default_continuous_projection() -> NormalProjectionNetworkConfig {
    NormalProjectionNetworkConfig::default()
        .with_init_action_stddev(0.35)
        .with_init_means_output_factor(0.1)
}
