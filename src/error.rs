use thiserror::Error;

/// Errors returned by the index and clustering routines in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// A point or query has the wrong dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// Parallel coordinate arrays have different lengths.
    #[error("length mismatch for {name}: expected {expected}, found {found}")]
    LengthMismatch {
        /// Name of the offending array.
        name: &'static str,
        /// Expected length (taken from the first array).
        expected: usize,
        /// Found length.
        found: usize,
    },
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
