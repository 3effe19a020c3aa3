//! Error types for CRS handling.

use thiserror::Error;

/// Errors raised while parsing a CRS or transforming coordinates.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The CRS is well-formed but not in the supported EPSG table.
    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// The CRS text could not be understood.
    #[error("invalid CRS definition {definition:?}: {message}")]
    InvalidDefinition { definition: String, message: String },

    /// The projection library rejected a coordinate.
    #[error("coordinate transform failed: {0}")]
    TransformFailed(String),

    /// Batch inputs must have one y per x.
    #[error("coordinate arrays differ in length: {xs} x values, {ys} y values")]
    LengthMismatch { xs: usize, ys: usize },
}

impl ProjectionError {
    /// Create an InvalidDefinition error.
    pub fn invalid_definition(definition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            definition: definition.into(),
            message: message.into(),
        }
    }

    /// Create a TransformFailed error.
    pub fn transform_failed(msg: impl Into<String>) -> Self {
        Self::TransformFailed(msg.into())
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
