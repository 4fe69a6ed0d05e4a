//! Error types for risk and return estimation.

use thiserror::Error;

use crate::covariance::CovarianceError;

/// Result type for risk operations.
pub type Result<T> = std::result::Result<T, RiskError>;

/// Errors that can occur while estimating moments, metrics or posterior returns.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Covariance estimation or matrix utility failure
    #[error(transparent)]
    Covariance(#[from] CovarianceError),

    /// Underlying data error
    #[error(transparent)]
    Data(#[from] tangent_data::DataError),

    /// Invalid investor view
    #[error(transparent)]
    View(#[from] ViewError),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Not enough observations
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Returns contain missing values
    #[error("Returns contain missing values; drop incomplete assets or rows first")]
    MissingValues,

    /// Standard deviation is zero, Sharpe ratio undefined
    #[error("Portfolio standard deviation is zero; Sharpe ratio is undefined")]
    ZeroVolatility,

    /// Market portfolio variance is zero, implied risk aversion undefined
    #[error("Market portfolio variance is zero; implied risk aversion is undefined")]
    ZeroMarketVariance,

    /// A matrix that must be inverted is singular or ill-conditioned
    #[error("{matrix} is singular or ill-conditioned (condition number {condition_number:e})")]
    SingularMatrix {
        /// Which matrix failed
        matrix: &'static str,
        /// Ratio of largest to smallest absolute eigenvalue
        condition_number: f64,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors in the textual or structural form of an investor view.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// Operator other than `>`, `<` or `=`
    #[error("Unknown view operator '{0}': expected '>', '<' or '='")]
    UnknownOperator(String),

    /// View names an asset outside the universe
    #[error("View references unknown asset '{0}'")]
    UnknownAsset(String),

    /// View text could not be parsed
    #[error("Malformed view '{0}': expected 'A > B r', 'A < B r' or 'A = r'")]
    Malformed(String),

    /// View return is not a finite number
    #[error("Invalid view return '{0}'")]
    InvalidReturn(String),

    /// Relative view compares an asset with itself
    #[error("Relative view compares '{0}' with itself")]
    SelfComparison(String),
}
