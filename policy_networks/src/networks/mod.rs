//! Policy networks.
//!
//! - [`ActorDistributionNetwork`]: observation to a nest of action distributions
//! - [`ProjectionNetwork`]: per-leaf heads ([`CategoricalProjectionNetwork`],
//!   [`NormalProjectionNetwork`]) built through a [`ProjectionFactory`]

pub mod actor_distribution;
pub mod categorical_projection;
pub mod network;
pub mod normal_projection;
pub mod projection;

#[cfg(test)]
mod tests;

pub use actor_distribution::{ActorDistributionNetwork, ActorDistributionNetworkConfig};
pub use categorical_projection::{CategoricalProjectionNetwork, CategoricalProjectionNetworkConfig};
pub use network::{DistributionNetwork, NetworkState, ObservationTensor, StepType};
pub use normal_projection::{MeanTransform, NormalProjectionNetwork, NormalProjectionNetworkConfig};
pub use projection::{
    default_continuous_projection, default_discrete_projection, ProjectionFactory, ProjectionNetwork,
};
