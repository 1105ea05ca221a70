//! Batch squashing for layers that expect a single batch dimension.
//!
//! Observations arrive with any number of leading "outer" dimensions
//! (`[B, ..]`, `[B, T, ..]`, or none at all for a single example). Layers
//! run on `[N, ..]` tensors, so the outer dimensions are collapsed into one
//! before the layers and restored afterwards.
//!
//! ```text
//! [B, T, 84, 84, 3] --flatten--> [B*T, 84, 84, 3] --layers--> [B*T, F] --unflatten--> [B, T, F]
//! ```
//!
//! Burn tensors carry their rank in the type while the outer rank is only
//! known at runtime, so restored features are held in an [`OuterBatch`]
//! which records the outer shape next to the `[N, F]` features and can be
//! turned back into a ranked tensor with [`OuterBatch::into_tensor`].

use burn::prelude::*;
use burn::tensor::BasicOps;

use crate::error::{NetworkError, Result};
use crate::specs::TensorSpec;

/// Number of leading dimensions of `shape` beyond the per-example `spec` shape.
///
/// Fails when the trailing dimensions of `shape` don't match `spec`.
pub fn outer_rank(shape: &[usize], spec: &TensorSpec) -> Result<usize> {
    let inner = spec.rank();
    if shape.len() < inner || shape[shape.len() - inner..] != spec.shape[..] {
        return Err(NetworkError::ShapeMismatch {
            expected: spec.shape.clone(),
            actual: shape.to_vec(),
        });
    }
    Ok(shape.len() - inner)
}

/// Reshape a `[N, F]` tensor into `shape`, checking the rank at runtime.
pub fn reshape_to<B, const D: usize, K>(tensor: Tensor<B, 2, K>, shape: &[usize]) -> Result<Tensor<B, D, K>>
where
    B: Backend,
    K: BasicOps<B>,
{
    let [n, f] = tensor.dims();
    if shape.len() != D || shape.iter().product::<usize>() != n * f {
        return Err(NetworkError::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![n, f],
        });
    }
    let target: [usize; D] = std::array::from_fn(|i| shape[i]);
    Ok(tensor.reshape(target))
}

/// Collapses the outer dimensions of a tensor and restores them later.
#[derive(Debug, Clone)]
pub struct BatchSquash {
    outer_rank: usize,
    outer_shape: Option<Vec<usize>>,
}

impl BatchSquash {
    /// Create a squash for inputs with `outer_rank` leading dimensions.
    pub fn new(outer_rank: usize) -> Self {
        Self {
            outer_rank,
            outer_shape: None,
        }
    }

    pub fn outer_rank(&self) -> usize {
        self.outer_rank
    }

    /// Outer shape seen by the last [`BatchSquash::flatten`], if any.
    pub fn outer_shape(&self) -> Option<&[usize]> {
        self.outer_shape.as_deref()
    }

    /// Collapse the outer dimensions of `tensor` into one.
    ///
    /// `D2` must equal `D - outer_rank + 1`. With an outer rank of zero a
    /// batch dimension of size one is added.
    pub fn flatten<B: Backend, const D: usize, const D2: usize>(
        &mut self,
        tensor: Tensor<B, D>,
    ) -> Result<Tensor<B, D2>> {
        let dims = tensor.dims();
        if D < self.outer_rank || D2 + self.outer_rank != D + 1 {
            return Err(NetworkError::unsupported(format!(
                "cannot squash {} outer dims of a rank {} tensor into rank {}",
                self.outer_rank, D, D2
            )));
        }
        let outer = dims[..self.outer_rank].to_vec();
        let batch: usize = outer.iter().product();
        let target: [usize; D2] = std::array::from_fn(|i| {
            if i == 0 {
                batch
            } else {
                dims[self.outer_rank + i - 1]
            }
        });
        self.outer_shape = Some(outer);
        Ok(tensor.reshape(target))
    }

    /// Collapse the outer dimensions into `N` and the remaining ones into `F`.
    pub fn flatten_features<B: Backend, const D: usize>(&mut self, tensor: Tensor<B, D>) -> Result<Tensor<B, 2>> {
        let dims = tensor.dims();
        if D < self.outer_rank {
            return Err(NetworkError::unsupported(format!(
                "cannot squash {} outer dims of a rank {} tensor",
                self.outer_rank, D
            )));
        }
        let outer = dims[..self.outer_rank].to_vec();
        let batch: usize = outer.iter().product();
        let features: usize = dims[self.outer_rank..].iter().product();
        self.outer_shape = Some(outer);
        Ok(tensor.reshape([batch, features]))
    }

    /// Take the features of an already restored batch, recording its outer shape.
    pub fn flatten_batch<B: Backend>(&mut self, batch: OuterBatch<B>) -> Result<Tensor<B, 2>> {
        if batch.outer_rank() != self.outer_rank {
            return Err(NetworkError::ShapeMismatch {
                expected: vec![self.outer_rank],
                actual: vec![batch.outer_rank()],
            });
        }
        self.outer_shape = Some(batch.outer_shape);
        Ok(batch.features)
    }

    /// Restore the outer dimensions on `[N, F]` features.
    pub fn unflatten<B: Backend>(&self, features: Tensor<B, 2>) -> Result<OuterBatch<B>> {
        let outer = self.recorded()?;
        OuterBatch::new(features, outer.to_vec())
    }

    /// Restore the outer dimensions into a statically ranked tensor.
    ///
    /// `D2` must equal `D - 1 + outer_rank`.
    pub fn unflatten_tensor<B: Backend, const D: usize, const D2: usize>(
        &self,
        tensor: Tensor<B, D>,
    ) -> Result<Tensor<B, D2>> {
        let outer = self.recorded()?;
        let dims = tensor.dims();
        if D == 0 || D2 + 1 != D + self.outer_rank {
            return Err(NetworkError::unsupported(format!(
                "cannot restore {} outer dims of a rank {} tensor into rank {}",
                self.outer_rank, D, D2
            )));
        }
        let batch: usize = outer.iter().product();
        if dims[0] != batch {
            return Err(NetworkError::ShapeMismatch {
                expected: outer.to_vec(),
                actual: dims.to_vec(),
            });
        }
        let target: [usize; D2] = std::array::from_fn(|i| {
            if i < self.outer_rank {
                outer[i]
            } else {
                dims[i + 1 - self.outer_rank]
            }
        });
        Ok(tensor.reshape(target))
    }

    fn recorded(&self) -> Result<&[usize]> {
        self.outer_shape
            .as_deref()
            .ok_or_else(|| NetworkError::unsupported("unflatten called before flatten"))
    }
}

/// `[N, F]` features together with the outer shape `N` was squashed from.
#[derive(Debug, Clone)]
pub struct OuterBatch<B: Backend> {
    features: Tensor<B, 2>,
    outer_shape: Vec<usize>,
}

impl<B: Backend> OuterBatch<B> {
    /// Pair `features` with `outer_shape`; the batch size must match.
    pub fn new(features: Tensor<B, 2>, outer_shape: Vec<usize>) -> Result<Self> {
        let [n, f] = features.dims();
        if outer_shape.iter().product::<usize>() != n {
            return Err(NetworkError::ShapeMismatch {
                expected: outer_shape,
                actual: vec![n, f],
            });
        }
        Ok(Self {
            features,
            outer_shape,
        })
    }

    pub fn outer_shape(&self) -> &[usize] {
        &self.outer_shape
    }

    pub fn outer_rank(&self) -> usize {
        self.outer_shape.len()
    }

    /// Collapsed batch size.
    pub fn batch_size(&self) -> usize {
        self.features.dims()[0]
    }

    pub fn feature_size(&self) -> usize {
        self.features.dims()[1]
    }

    /// The squashed `[N, F]` features.
    pub fn features(&self) -> &Tensor<B, 2> {
        &self.features
    }

    /// Full `outer_shape + [F]` tensor; `D` must be `outer_rank + 1`.
    pub fn into_tensor<const D: usize>(self) -> Result<Tensor<B, D>> {
        let mut shape = self.outer_shape;
        shape.push(self.features.dims()[1]);
        reshape_to(self.features, &shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_outer_rank() {
        let spec = TensorSpec::float([4]);
        assert_eq!(outer_rank(&[8, 4], &spec).unwrap(), 1);
        assert_eq!(outer_rank(&[8, 5, 4], &spec).unwrap(), 2);
        assert_eq!(outer_rank(&[4], &spec).unwrap(), 0);
    }

    #[test]
    fn test_outer_rank_shape_mismatch() {
        let spec = TensorSpec::float([2, 3]);
        let err = outer_rank(&[8, 3, 2], &spec).unwrap_err();
        assert_eq!(
            err,
            NetworkError::ShapeMismatch {
                expected: vec![2, 3],
                actual: vec![8, 3, 2]
            }
        );
        assert!(outer_rank(&[3], &spec).is_err());
    }

    #[test]
    fn test_flatten_unflatten_batch_time() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 3>::zeros([2, 5, 4], &device);

        let mut squash = BatchSquash::new(2);
        let flat: Tensor<TestBackend, 2> = squash.flatten(input).unwrap();
        assert_eq!(flat.dims(), [10, 4]);
        assert_eq!(squash.outer_shape(), Some(&[2, 5][..]));

        let hidden = Tensor::<TestBackend, 2>::ones([10, 7], &device);
        let restored = squash.unflatten(hidden).unwrap();
        assert_eq!(restored.outer_shape(), &[2, 5]);
        let tensor: Tensor<TestBackend, 3> = restored.into_tensor().unwrap();
        assert_eq!(tensor.dims(), [2, 5, 7]);
    }

    #[test]
    fn test_flatten_preserves_values_in_order() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 3>::from_floats(
            [[[1.0, 2.0], [3.0, 4.0]], [[5.0, 6.0], [7.0, 8.0]]],
            &device,
        );
        let mut squash = BatchSquash::new(2);
        let flat: Tensor<TestBackend, 2> = squash.flatten(input).unwrap();
        let data = flat.into_data();
        assert_eq!(
            data.as_slice::<f32>().unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
        );
    }

    #[test]
    fn test_zero_outer_rank_adds_batch() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 1>::zeros([4], &device);
        let mut squash = BatchSquash::new(0);
        let flat: Tensor<TestBackend, 2> = squash.flatten(input).unwrap();
        assert_eq!(flat.dims(), [1, 4]);

        let restored: Tensor<TestBackend, 1> = squash.unflatten_tensor(flat).unwrap();
        assert_eq!(restored.dims(), [4]);
    }

    #[test]
    fn test_flatten_rejects_wrong_target_rank() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 3>::zeros([2, 5, 4], &device);
        let mut squash = BatchSquash::new(2);
        let result: Result<Tensor<TestBackend, 3>> = squash.flatten(input);
        assert!(matches!(result, Err(NetworkError::Unsupported { .. })));
    }

    #[test]
    fn test_unflatten_before_flatten_fails() {
        let device = Default::default();
        let squash = BatchSquash::new(1);
        let hidden = Tensor::<TestBackend, 2>::zeros([3, 2], &device);
        assert!(squash.unflatten(hidden).is_err());
    }

    #[test]
    fn test_unflatten_tensor_restores_image_batch() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 5>::zeros([2, 3, 6, 6, 1], &device);
        let mut squash = BatchSquash::new(2);
        let flat: Tensor<TestBackend, 4> = squash.flatten(input).unwrap();
        assert_eq!(flat.dims(), [6, 6, 6, 1]);
        let restored: Tensor<TestBackend, 5> = squash.unflatten_tensor(flat).unwrap();
        assert_eq!(restored.dims(), [2, 3, 6, 6, 1]);
    }

    #[test]
    fn test_flatten_features_collapses_inner_dims() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::zeros([3, 2, 4, 5], &device);
        let mut squash = BatchSquash::new(1);
        let flat = squash.flatten_features(input).unwrap();
        assert_eq!(flat.dims(), [3, 40]);
        assert_eq!(squash.outer_shape(), Some(&[3][..]));
    }

    #[test]
    fn test_outer_batch_rejects_wrong_batch() {
        let device = Default::default();
        let features = Tensor::<TestBackend, 2>::zeros([6, 2], &device);
        assert!(OuterBatch::new(features, vec![4, 2]).is_err());
    }
}
