//! Categorical distribution over the classes of a discrete action.

use burn::prelude::*;
use burn::tensor::activation::softmax;

use crate::error::{NetworkError, Result};
use crate::nn::squash::reshape_to;

/// Categorical distribution parameterized by unnormalized logits.
///
/// Logits are held as `[M, num_classes]` where `M` is the product of
/// [`Categorical::batch_shape`] (outer dims followed by the action shape).
#[derive(Clone, Debug)]
pub struct Categorical<B: Backend> {
    logits: Tensor<B, 2>,
    batch_shape: Vec<usize>,
}

impl<B: Backend> Categorical<B> {
    /// Create from `[M, num_classes]` logits and the batch shape they flatten.
    pub fn new(logits: Tensor<B, 2>, batch_shape: Vec<usize>) -> Result<Self> {
        let [rows, classes] = logits.dims();
        if batch_shape.iter().product::<usize>() != rows {
            return Err(NetworkError::ShapeMismatch {
                expected: batch_shape,
                actual: vec![rows, classes],
            });
        }
        Ok(Self {
            logits,
            batch_shape,
        })
    }

    /// Outer dims followed by the action shape.
    pub fn batch_shape(&self) -> &[usize] {
        &self.batch_shape
    }

    pub fn num_classes(&self) -> usize {
        self.logits.dims()[1]
    }

    /// Logits flattened to `[M, num_classes]`.
    pub fn logits_flat(&self) -> &Tensor<B, 2> {
        &self.logits
    }

    /// Logits shaped `batch_shape + [num_classes]`.
    pub fn logits<const D: usize>(&self) -> Result<Tensor<B, D>> {
        reshape_to(self.logits.clone(), &self.event_shape_with_classes())
    }

    /// Class probabilities shaped `batch_shape + [num_classes]`.
    pub fn probs<const D: usize>(&self) -> Result<Tensor<B, D>> {
        reshape_to(softmax(self.logits.clone(), 1), &self.event_shape_with_classes())
    }

    /// Most likely class index, shaped `batch_shape`.
    pub fn mode<const D: usize>(&self) -> Result<Tensor<B, D, Int>> {
        let flat: Tensor<B, 2, Int> = self.logits.clone().argmax(1);
        if self.batch_shape.is_empty() {
            // A single unbatched scalar action comes back as `[1]`.
            return reshape_to(flat, &[1]);
        }
        reshape_to(flat, &self.batch_shape)
    }

    fn event_shape_with_classes(&self) -> Vec<usize> {
        let mut shape = self.batch_shape.clone();
        shape.push(self.num_classes());
        shape
    }
}
