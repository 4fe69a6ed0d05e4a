//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// CSV reading error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Dates are not strictly increasing
    #[error("Dates must be strictly increasing: {previous} is followed by {next}")]
    UnsortedDates {
        /// Earlier row date
        previous: String,
        /// Offending row date
        next: String,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Asset listed twice
    #[error("Duplicate asset: {0}")]
    DuplicateAsset(String),

    /// Asset not present in the table
    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    /// Market capitalisation missing for an asset
    #[error("Missing market cap for {0}")]
    MissingMarketCap(String),

    /// Market capitalisation is zero, negative or not finite
    #[error("Invalid market cap for {asset}: {value}")]
    InvalidMarketCap {
        /// Asset identifier
        asset: String,
        /// Supplied value
        value: f64,
    },

    /// Lookback window is zero, negative or not finite
    #[error("Invalid lookback: {0} years")]
    InvalidLookback(f64),

    /// Not enough rows for the requested operation
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData {
        /// Required number of rows
        required: usize,
        /// Actual number of rows
        actual: usize,
    },
}
