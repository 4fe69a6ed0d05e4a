//! Error types for portfolio optimization.

use thiserror::Error;

use crate::optimizer::OptimizationResult;

/// Result type for optimization operations.
pub type Result<T> = std::result::Result<T, OptimizeError>;

/// Errors that can occur while setting up or solving a portfolio problem.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Asset universe has no assets
    #[error("Asset universe is empty")]
    EmptyUniverse,

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A single asset's bounds are outside [0, 1] or inverted
    #[error("Invalid bounds for asset {index}: [{lower}, {upper}] must satisfy 0 <= lower <= upper <= 1")]
    InvalidBounds {
        /// Asset position
        index: usize,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Bounds admit no fully-invested portfolio
    #[error("Infeasible bounds: sum of lower bounds {lower_sum} must be <= 1 and sum of upper bounds {upper_sum} must be >= 1")]
    InfeasibleBounds {
        /// Sum of lower bounds
        lower_sum: f64,
        /// Sum of upper bounds
        upper_sum: f64,
    },

    /// Bound override names an asset outside the universe
    #[error("Bound override for unknown asset '{0}'")]
    UnknownAsset(String),

    /// Target return cannot be reached under the bounds
    #[error("Target return {target} outside achievable range [{min}, {max}]")]
    TargetOutOfRange {
        /// Requested annual return
        target: f64,
        /// Lowest achievable annual return
        min: f64,
        /// Highest achievable annual return
        max: f64,
    },

    /// Risk factor outside [0, 1]
    #[error("Risk factor {0} must be between 0 and 1")]
    InvalidRiskFactor(f64),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Solver did not satisfy its tolerances
    #[error("Solver failed on {}: {}", .0.problem, .0.message)]
    SolverFailed(Box<OptimizationResult>),

    /// Risk metric error
    #[error(transparent)]
    Risk(#[from] tangent_risk::RiskError),
}
