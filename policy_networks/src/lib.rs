//! # Policy Networks: Actor Distribution Networks for RL
//!
//! Burn modules that map observations to action distributions, one
//! distribution per leaf of a (possibly nested) action spec.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 ActorDistributionNetwork                  │
//! ├──────────────────────────────────────────────────────────┤
//! │  observation [outer.., obs..]                             │
//! │        │                                                  │
//! │        ▼                                                  │
//! │  ┌────────────┐   conv layers (optional, [H, W, C] obs)   │
//! │  │ MlpLayers  │   dense layers                            │
//! │  └─────┬──────┘                                           │
//! │        │ [outer.., F]                                     │
//! │   ┌────┴─────────────┐                                    │
//! │   ▼                  ▼                                    │
//! │ Categorical       Normal          one head per action leaf │
//! │ projection        projection      (integer / float dtype)  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use policy_networks::{
//!     ActorDistributionNetworkConfig, BoundedTensorSpec, DistributionNetwork, Nest, TensorSpec,
//! };
//!
//! let net = ActorDistributionNetworkConfig::new()
//!     .with_fc_layer_params([64, 64])
//!     .init::<B>(
//!         TensorSpec::float([4]).into(),
//!         BoundedTensorSpec::discrete(Vec::new(), 0, 1)?.into(),
//!         &device,
//!     )?;
//!
//! let (distributions, state) = net.forward(Nest::Leaf(obs.into()), None, Nest::empty())?;
//! let logits = distributions.flatten()[0].as_categorical().unwrap().logits::<2>()?;
//! ```

pub mod distributions;
pub mod error;
pub mod networks;
pub mod nn;
pub mod specs;

pub use distributions::{ActionDistribution, Categorical, Normal};
pub use error::{NetworkError, Result};
pub use networks::{
    default_continuous_projection, default_discrete_projection, ActorDistributionNetwork,
    ActorDistributionNetworkConfig, CategoricalProjectionNetwork, CategoricalProjectionNetworkConfig,
    DistributionNetwork, MeanTransform, NetworkState, NormalProjectionNetwork,
    NormalProjectionNetworkConfig, ObservationTensor, ProjectionFactory, ProjectionNetwork, StepType,
};
pub use nn::{Activation, ConvLayerParams};
pub use specs::{BoundedTensorSpec, DistributionKind, DistributionSpec, Nest, TensorSpec};
