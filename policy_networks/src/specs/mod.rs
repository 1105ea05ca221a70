//! Specs describing observations, actions and distribution outputs.
//!
//! - [`Nest`]: nested container (leaf, sequence or named map) used for every
//!   spec and every batch of tensors that follows a spec
//! - [`TensorSpec`] / [`BoundedTensorSpec`]: per-example shape and dtype
//! - [`DistributionSpec`]: what a projection network emits

pub mod nest;
pub mod tensor_spec;

pub use nest::Nest;
pub use tensor_spec::{is_discrete_dtype, BoundedTensorSpec, DistributionKind, DistributionSpec, TensorSpec};
