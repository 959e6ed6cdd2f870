//! Error types for profile histogram analysis
//!
//! Provides a unified error type for all profile-stats crates. Only
//! unrecoverable conditions (I/O, corrupt records, invalid configuration)
//! surface as errors; data inconsistencies are logged and absorbed by the
//! histogram operations themselves.

use thiserror::Error;

/// Core error type for profile histogram operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialized record declares more nonzero bins than the schema allows
    #[error("Corrupt histogram record: {used} of {bins} bins used")]
    CorruptRecord { used: u32, bins: usize },

    /// A serialized bin record points outside the bin array
    #[error("Bin index {index} out of range for {bins} bins")]
    BinOutOfRange { index: u32, bins: usize },

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for a bin count that cannot hold any weight
    pub fn invalid_bin_count(bins: usize) -> Self {
        Self::InvalidParameter(format!("bin count must be positive, got {bins}"))
    }

    /// Create an error for a weight that is negative or not finite
    pub fn invalid_weight(weight: f64, context: &str) -> Self {
        Self::InvalidParameter(format!(
            "{context}: weight {weight} must be finite and non-negative"
        ))
    }

    /// True when the error came from the underlying reader/writer
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
