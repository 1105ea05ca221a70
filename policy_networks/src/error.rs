//! Error types for network construction and evaluation.

use std::fmt;

/// Result type for policy network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while building or evaluating a network.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// The observation spec holds more than one observation.
    MultipleObservations {
        count: usize,
    },
    /// A tensor spec or bound is malformed.
    InvalidSpec {
        message: String,
    },
    /// A flat sequence does not fit the nest it is packed into.
    NestStructure {
        expected: usize,
        actual: usize,
    },
    /// A tensor shape is incompatible with the declared spec.
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    /// Configuration the network cannot realize.
    Unsupported {
        message: String,
    },
}

impl NetworkError {
    pub(crate) fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleObservations { count } => write!(
                f,
                "Only a single observation is supported by this network, got {}",
                count
            ),
            Self::InvalidSpec { message } => write!(f, "Invalid spec: {}", message),
            Self::NestStructure { expected, actual } => write!(
                f,
                "Nest structure mismatch: expected {} leaves, got {}",
                expected, actual
            ),
            Self::ShapeMismatch { expected, actual } => write!(
                f,
                "Shape mismatch: expected {:?}, got {:?}",
                expected, actual
            ),
            Self::Unsupported { message } => write!(f, "Unsupported configuration: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}
