//! Error types for applicator-core

use thiserror::Error;

use crate::value::{Shape, Type};

/// Result type alias for applicator-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in applicator-core
#[derive(Error, Debug)]
pub enum Error {
    /// The value at this position cannot be traversed or mutated
    #[error("cannot apply to {shape} value: {reason}")]
    CannotApply {
        /// Shape of the rejected value
        shape: Shape,
        /// Why the value was rejected
        reason: &'static str,
    },

    /// An annotation named a transform that is not registered
    #[error("transform '{name}' not found")]
    NotFound {
        /// Directive name that failed to resolve
        name: String,
    },

    /// A transform chain produced a value whose type differs from the field type
    #[error("cannot set field '{field}': expected {expected}, transform chain produced {found}")]
    InvalidSet {
        /// Field being written
        field: String,
        /// Declared type of the field
        expected: Type,
        /// Type of the chain's output
        found: Type,
    },

    /// A transform received a value kind it does not handle
    #[error("transform '{transform}' does not support {found} values")]
    Unsupported {
        /// Name of the transform
        transform: String,
        /// Type of the rejected input
        found: Type,
    },

    /// A user-provided transform failed
    #[error("transform error in '{transform}': {message}")]
    TransformError {
        /// Name of the transform
        transform: String,
        /// Description of the error
        message: String,
    },

    /// Traversal nested deeper than the configured limit
    #[error("traversal exceeded the maximum depth of {limit}")]
    DepthExceeded {
        /// Configured `max_depth`
        limit: usize,
    },

    /// A dynamic value could not be converted back into a Rust type
    #[error("cannot convert {found} into {expected}")]
    Conversion {
        /// Type that was expected
        expected: String,
        /// What was found instead
        found: String,
    },

    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::TransformError`] for a custom transform.
    pub fn transform(transform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransformError {
            transform: transform.into(),
            message: message.into(),
        }
    }

    /// Whether this is the recoverable [`Error::CannotApply`] kind.
    pub fn is_cannot_apply(&self) -> bool {
        matches!(self, Self::CannotApply { .. })
    }

    pub(crate) fn cannot_apply(shape: Shape, reason: &'static str) -> Self {
        Self::CannotApply { shape, reason }
    }

    pub(crate) fn conversion(expected: impl Into<String>, found: impl ToString) -> Self {
        Self::Conversion {
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}
