//! # Error Types
//!
//! Every failure the extractors can raise maps onto one [`ErrorKind`]. Errors are
//! always fatal to the current call: nothing is retried and no partial result is
//! returned.

use thiserror::Error;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Coarse classification of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad path, label, output location or job configuration.
    Config,
    /// A requested variable is absent from the dataset.
    Schema,
    /// Wrong rank, non-finite values or mismatched lengths.
    Shape,
    /// Malformed or out-of-range index arrays.
    IndexBounds,
    /// Unsupported output format or array representation.
    Unsupported,
    /// Operation called before its prerequisite step succeeded.
    State,
    /// Failure reported by the underlying reader, writer or filesystem.
    Io,
}

/// Errors raised by the coordinate and grid value extractors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Variable '{0}' not found in dataset")]
    Schema(String),

    #[error("Invalid shape or type: {0}")]
    Shape(String),

    #[error("Invalid indices for location '{label}': {reason}")]
    IndexBounds { label: String, reason: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ExtractError {
    pub(crate) fn index_bounds(label: &str, reason: impl Into<String>) -> Self {
        ExtractError::IndexBounds {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::Config(_) => ErrorKind::Config,
            ExtractError::Schema(_) => ErrorKind::Schema,
            ExtractError::Shape(_) => ErrorKind::Shape,
            ExtractError::IndexBounds { .. } => ErrorKind::IndexBounds,
            ExtractError::Unsupported(_) => ErrorKind::Unsupported,
            ExtractError::State(_) => ErrorKind::State,
            ExtractError::Json(_) | ExtractError::Yaml(_) => ErrorKind::Config,
            ExtractError::NetCdf(_) | ExtractError::Hdf5(_) | ExtractError::Io(_) => ErrorKind::Io,
        }
    }
}
