//! Error types for openspeak-vector.

use thiserror::Error;

/// Result type for openspeak-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in openspeak-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Collection not found.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Dimension mismatch between a vector and its collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (empty, contains NaN or infinity).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Two points in one build share an id.
    #[error("Duplicate vector id '{0}'")]
    DuplicateId(String),

    /// Persistence error (serialization, corrupt files).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
