//! Element-wise Gaussian distribution over a continuous action.

use burn::prelude::*;

use crate::error::{NetworkError, Result};
use crate::nn::squash::reshape_to;

/// Independent Normal per action element.
///
/// `loc` and `scale` are held as `[N, E]` where `N` is the product of the
/// outer dims and `E` the number of action elements; the logical batch
/// shape is `outer_shape + action_shape`.
#[derive(Clone, Debug)]
pub struct Normal<B: Backend> {
    loc: Tensor<B, 2>,
    scale: Tensor<B, 2>,
    batch_shape: Vec<usize>,
}

impl<B: Backend> Normal<B> {
    /// Create from `[N, E]` means and standard deviations.
    pub fn new(loc: Tensor<B, 2>, scale: Tensor<B, 2>, batch_shape: Vec<usize>) -> Result<Self> {
        let dims = loc.dims();
        if scale.dims() != dims {
            return Err(NetworkError::ShapeMismatch {
                expected: dims.to_vec(),
                actual: scale.dims().to_vec(),
            });
        }
        if batch_shape.iter().product::<usize>() != dims[0] * dims[1] {
            return Err(NetworkError::ShapeMismatch {
                expected: batch_shape,
                actual: dims.to_vec(),
            });
        }
        Ok(Self {
            loc,
            scale,
            batch_shape,
        })
    }

    /// Outer dims followed by the action shape.
    pub fn batch_shape(&self) -> &[usize] {
        &self.batch_shape
    }

    /// Means flattened to `[N, E]`.
    pub fn loc_flat(&self) -> &Tensor<B, 2> {
        &self.loc
    }

    /// Standard deviations flattened to `[N, E]`.
    pub fn scale_flat(&self) -> &Tensor<B, 2> {
        &self.scale
    }

    /// Means shaped `batch_shape`.
    pub fn loc<const D: usize>(&self) -> Result<Tensor<B, D>> {
        reshape_to(self.loc.clone(), &self.batch_shape)
    }

    /// Standard deviations shaped `batch_shape`.
    pub fn scale<const D: usize>(&self) -> Result<Tensor<B, D>> {
        reshape_to(self.scale.clone(), &self.batch_shape)
    }

    /// The most likely value, which is the mean.
    pub fn mode<const D: usize>(&self) -> Result<Tensor<B, D>> {
        self.loc()
    }
}
