//! Error types for grids, cells and coverings.

use projection::ProjectionError;
use thiserror::Error;

/// Errors raised by the grid engine.
#[derive(Error, Debug)]
pub enum GridError {
    /// The `grid` parameter names no known grid.
    #[error("unsupported grid: {name}")]
    UnsupportedGrid { name: String },

    /// Bad CRS, out-of-range cell size, unparsable number, etc.
    #[error("invalid grid configuration: {0}")]
    InvalidConfig(String),

    /// A cell URI that does not follow the grid's format.
    #[error("invalid cell URI {uri:?}: {reason}")]
    InvalidCellUri { uri: String, reason: String },

    /// The AOI holds no coordinates.
    #[error("AOI is empty")]
    EmptyAoi,

    /// The AOI bounds collapse to an empty box in the grid CRS.
    #[error("AOI bounds are empty in the grid CRS")]
    EmptyBounds,

    /// The covering raster would not fit in the memory budget.
    #[error("covering needs {required} bytes, memory limit is {limit}")]
    MemoryLimitExceeded { required: u128, limit: i64 },

    /// CRS parsing or coordinate transform failure.
    #[error("transform error: {0}")]
    Transform(#[from] ProjectionError),

    /// Failure of the rasterizer.
    #[error("rasterize error: {0}")]
    Rasterize(String),

    /// The affine transform has a zero determinant.
    #[error("affine transform is not invertible")]
    NonInvertible,

    /// WKB/GeoJSON encoding or decoding failure.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The covering worker could not be started or died.
    #[error("covering worker error: {0}")]
    Worker(String),

    /// The covering was cancelled by its token.
    #[error("covering cancelled")]
    Cancelled,
}

impl GridError {
    /// Create an UnsupportedGrid error.
    pub fn unsupported_grid(name: impl Into<String>) -> Self {
        Self::UnsupportedGrid { name: name.into() }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an InvalidCellUri error.
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCellUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a Rasterize error.
    pub fn rasterize(msg: impl Into<String>) -> Self {
        Self::Rasterize(msg.into())
    }

    /// Create an Encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<geozero::error::GeozeroError> for GridError {
    fn from(err: geozero::error::GeozeroError) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<geojson::Error> for GridError {
    fn from(err: geojson::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Result type for grid engine operations.
pub type Result<T> = std::result::Result<T, GridError>;
