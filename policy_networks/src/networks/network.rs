//! Common network interface.
//!
//! The trait mirrors how policies and training loops consume networks:
//! specs are fixed at construction, forward calls take a batch of
//! observations plus the previous network state and return outputs plus
//! the next network state.

use burn::module::Module;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distributions::ActionDistribution;
use crate::error::Result;
use crate::specs::{BoundedTensorSpec, DistributionSpec, Nest, TensorSpec};

/// Position of a step within an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepType {
    First,
    Mid,
    Last,
}

/// Recurrent state passed between forward calls.
///
/// Feed-forward networks use the empty nest.
pub type NetworkState<B> = Nest<Tensor<B, 2>>;

/// An observation tensor before it is cast to float.
#[derive(Debug, Clone)]
pub enum ObservationTensor<B: Backend, const D: usize> {
    Float(Tensor<B, D>),
    Int(Tensor<B, D, Int>),
}

impl<B: Backend, const D: usize> ObservationTensor<B, D> {
    pub fn dims(&self) -> [usize; D] {
        match self {
            ObservationTensor::Float(t) => t.dims(),
            ObservationTensor::Int(t) => t.dims(),
        }
    }

    /// Cast to a float tensor.
    pub fn into_float(self) -> Tensor<B, D> {
        match self {
            ObservationTensor::Float(t) => t,
            ObservationTensor::Int(t) => t.float(),
        }
    }
}

impl<B: Backend, const D: usize> From<Tensor<B, D>> for ObservationTensor<B, D> {
    fn from(tensor: Tensor<B, D>) -> Self {
        ObservationTensor::Float(tensor)
    }
}

impl<B: Backend, const D: usize> From<Tensor<B, D, Int>> for ObservationTensor<B, D> {
    fn from(tensor: Tensor<B, D, Int>) -> Self {
        ObservationTensor::Int(tensor)
    }
}

/// A network mapping observations to one distribution per action leaf.
///
/// # Implementation Notes
///
/// - `state_spec` is empty for feed-forward networks, which must hand the
///   incoming state back unchanged.
/// - `output_spec` mirrors `action_spec` leaf for leaf.
pub trait DistributionNetwork<B: Backend>: Module<B> {
    fn name(&self) -> &str;

    fn observation_spec(&self) -> &Nest<TensorSpec>;

    fn action_spec(&self) -> &Nest<BoundedTensorSpec>;

    fn state_spec(&self) -> &Nest<TensorSpec>;

    fn output_spec(&self) -> &Nest<DistributionSpec>;

    /// Evaluate a batch of observations.
    ///
    /// Observations may carry any number of leading batch dimensions on top
    /// of the observation spec's shape. `step_type` is accepted for
    /// interface compatibility with recurrent networks.
    fn forward<const D: usize>(
        &self,
        observations: Nest<ObservationTensor<B, D>>,
        step_type: Option<&[StepType]>,
        network_state: NetworkState<B>,
    ) -> Result<(Nest<ActionDistribution<B>>, NetworkState<B>)>;
}
