//! Error types for the vector index

use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Vector index errors
#[derive(Debug, Error)]
pub enum IndexError {
    /// Vector dimensionality does not match the index
    #[error("dimension mismatch: index expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Empty vector supplied
    #[error("vector must not be empty")]
    EmptyVector,

    /// Entry id already present in the index
    #[error("duplicate entry id: {0}")]
    DuplicateId(String),

    /// Invalid index configuration
    #[error("invalid index options: {0}")]
    InvalidOptions(String),
}
