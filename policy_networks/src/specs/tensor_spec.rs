//! Declarative tensor specs for observations, actions and distributions.

use std::collections::BTreeMap;

use burn::tensor::DType;
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};

/// Whether a dtype describes discrete values.
///
/// Integer dtypes are discrete; float and bool dtypes are not.
pub fn is_discrete_dtype(dtype: DType) -> bool {
    matches!(
        dtype,
        DType::I64
            | DType::I32
            | DType::I16
            | DType::I8
            | DType::U64
            | DType::U32
            | DType::U16
            | DType::U8
    )
}

/// Shape and dtype of a single tensor, without the batch dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSpec {
    /// Per-example shape.
    pub shape: Vec<usize>,
    /// Element type.
    pub dtype: DType,
    /// Optional name, for diagnostics only.
    pub name: Option<String>,
}

impl TensorSpec {
    /// Create a new spec.
    pub fn new(shape: impl Into<Vec<usize>>, dtype: DType) -> Self {
        Self {
            shape: shape.into(),
            dtype,
            name: None,
        }
    }

    /// `f32` spec of the given shape.
    pub fn float(shape: impl Into<Vec<usize>>) -> Self {
        Self::new(shape, DType::F32)
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of per-example dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements in one example.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_discrete(&self) -> bool {
        is_discrete_dtype(self.dtype)
    }
}

/// A [`TensorSpec`] with inclusive element bounds.
///
/// `minimum` and `maximum` hold either a single value broadcast to every
/// element, or one value per element in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedTensorSpec {
    /// Per-example shape.
    pub shape: Vec<usize>,
    /// Element type.
    pub dtype: DType,
    /// Inclusive lower bounds.
    pub minimum: Vec<f64>,
    /// Inclusive upper bounds.
    pub maximum: Vec<f64>,
    /// Optional name, for diagnostics only.
    pub name: Option<String>,
}

impl BoundedTensorSpec {
    /// Create a new bounded spec, validating the bounds.
    pub fn new(
        shape: impl Into<Vec<usize>>,
        dtype: DType,
        minimum: Vec<f64>,
        maximum: Vec<f64>,
    ) -> Result<Self> {
        let spec = Self {
            shape: shape.into(),
            dtype,
            minimum,
            maximum,
            name: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Integer action spec with the same `[minimum, maximum]` range everywhere.
    pub fn discrete(shape: impl Into<Vec<usize>>, minimum: i64, maximum: i64) -> Result<Self> {
        Self::new(shape, DType::I64, vec![minimum as f64], vec![maximum as f64])
    }

    /// `f32` action spec with the same `[minimum, maximum]` range everywhere.
    pub fn continuous(shape: impl Into<Vec<usize>>, minimum: f64, maximum: f64) -> Result<Self> {
        Self::new(shape, DType::F32, vec![minimum], vec![maximum])
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check bound lengths and ordering.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_elements();
        for (label, bound) in [("minimum", &self.minimum), ("maximum", &self.maximum)] {
            if bound.len() != 1 && bound.len() != n {
                return Err(NetworkError::invalid_spec(format!(
                    "{} has {} values, expected 1 or {} for shape {:?}",
                    label,
                    bound.len(),
                    n,
                    self.shape
                )));
            }
            if bound.iter().any(|v| !v.is_finite()) {
                return Err(NetworkError::invalid_spec(format!(
                    "{} must be finite, got {:?}",
                    label, bound
                )));
            }
        }
        for i in 0..n {
            let (lo, hi) = (self.minimum_at(i), self.maximum_at(i));
            if lo > hi {
                return Err(NetworkError::invalid_spec(format!(
                    "minimum {} exceeds maximum {} at element {}",
                    lo, hi, i
                )));
            }
        }
        Ok(())
    }

    /// Number of per-example dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements in one example.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_discrete(&self) -> bool {
        is_discrete_dtype(self.dtype)
    }

    /// Lower bound of element `index`, with scalar bounds broadcast.
    pub fn minimum_at(&self, index: usize) -> f64 {
        broadcast_at(&self.minimum, index)
    }

    /// Upper bound of element `index`, with scalar bounds broadcast.
    pub fn maximum_at(&self, index: usize) -> f64 {
        broadcast_at(&self.maximum, index)
    }

    /// Lower bounds expanded to one value per element.
    pub fn minimum_values(&self) -> Vec<f64> {
        (0..self.num_elements()).map(|i| self.minimum_at(i)).collect()
    }

    /// Upper bounds expanded to one value per element.
    pub fn maximum_values(&self) -> Vec<f64> {
        (0..self.num_elements()).map(|i| self.maximum_at(i)).collect()
    }

    /// The unbounded view of this spec.
    pub fn to_tensor_spec(&self) -> TensorSpec {
        TensorSpec {
            shape: self.shape.clone(),
            dtype: self.dtype,
            name: self.name.clone(),
        }
    }
}

fn broadcast_at(bound: &[f64], index: usize) -> f64 {
    if bound.len() == 1 {
        bound[0]
    } else {
        bound[index]
    }
}

/// Family of distribution a projection network emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionKind {
    Categorical,
    Normal,
}

/// Output spec of a projection network.
///
/// `sample_spec` is the action spec the distribution samples into and
/// `input_params` names the parameter tensors that define it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    pub kind: DistributionKind,
    pub sample_spec: BoundedTensorSpec,
    pub input_params: BTreeMap<String, TensorSpec>,
}

impl DistributionSpec {
    pub fn new(
        kind: DistributionKind,
        sample_spec: BoundedTensorSpec,
        input_params: impl IntoIterator<Item = (&'static str, TensorSpec)>,
    ) -> Self {
        Self {
            kind,
            sample_spec,
            input_params: input_params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Look up a parameter spec by name.
    pub fn param(&self, name: &str) -> Option<&TensorSpec> {
        self.input_params.get(name)
    }
}
