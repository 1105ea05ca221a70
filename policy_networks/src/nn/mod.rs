//! Layer building blocks shared by the policy networks.
//!
//! # Modules
//!
//! - [`activation`]: element-wise activations selectable from config
//! - [`init`]: variance-scaling initialization for projection heads
//! - [`mlp`]: optional convolutions followed by dense layers
//! - [`squash`]: collapsing and restoring arbitrary outer batch dimensions

pub mod activation;
pub mod init;
pub mod mlp;
pub mod squash;

pub use activation::Activation;
pub use init::{inverse_softplus, variance_scaling, variance_scaling_linear};
pub use mlp::{ConvLayerParams, MlpLayers, MlpLayersConfig};
pub use squash::{outer_rank, BatchSquash, OuterBatch};
