//! Distributions produced by projection networks.
//!
//! These are parameter holders: they expose the parameters with the outer
//! batch dimensions restored, nothing more.
//!
//! - [`Categorical`]: logits over the classes of a discrete action
//! - [`Normal`]: mean and standard deviation per continuous action element

pub mod categorical;
pub mod normal;

pub use categorical::Categorical;
pub use normal::Normal;

use burn::prelude::*;

use crate::specs::DistributionKind;

/// Distribution over one action leaf.
#[derive(Clone, Debug)]
pub enum ActionDistribution<B: Backend> {
    Categorical(Categorical<B>),
    Normal(Normal<B>),
}

impl<B: Backend> ActionDistribution<B> {
    /// Outer dims followed by the action shape.
    pub fn batch_shape(&self) -> &[usize] {
        match self {
            ActionDistribution::Categorical(dist) => dist.batch_shape(),
            ActionDistribution::Normal(dist) => dist.batch_shape(),
        }
    }

    pub fn kind(&self) -> DistributionKind {
        match self {
            ActionDistribution::Categorical(_) => DistributionKind::Categorical,
            ActionDistribution::Normal(_) => DistributionKind::Normal,
        }
    }

    pub fn as_categorical(&self) -> Option<&Categorical<B>> {
        match self {
            ActionDistribution::Categorical(dist) => Some(dist),
            _ => None,
        }
    }

    pub fn as_normal(&self) -> Option<&Normal<B>> {
        match self {
            ActionDistribution::Normal(dist) => Some(dist),
            _ => None,
        }
    }
}

impl<B: Backend> From<Categorical<B>> for ActionDistribution<B> {
    fn from(dist: Categorical<B>) -> Self {
        ActionDistribution::Categorical(dist)
    }
}

impl<B: Backend> From<Normal<B>> for ActionDistribution<B> {
    fn from(dist: Normal<B>) -> Self {
        ActionDistribution::Normal(dist)
    }
}
