//! Error types for the backtester and the advisor.

use thiserror::Error;

/// Errors from a walk-forward backtest.
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Split length leaves no training or no testing rows
    #[error("Invalid split: {length} rows out of {rows} leaves an empty training or testing window")]
    InvalidSplit {
        /// Requested window length
        length: usize,
        /// Rows in the price table
        rows: usize,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A round failed outside data-quality handling
    #[error("Round {round} failed: {source}")]
    Round {
        /// Zero-based round index
        round: usize,
        /// Underlying error
        #[source]
        source: Box<Self>,
    },

    /// Data error
    #[error(transparent)]
    Data(#[from] tangent_data::DataError),

    /// Risk model error
    #[error(transparent)]
    Risk(#[from] tangent_risk::RiskError),

    /// Optimization error
    #[error(transparent)]
    Optimize(#[from] tangent_optimize::OptimizeError),
}

/// Errors from an allocation request.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Benchmark column is missing or has too little data
    #[error("Benchmark {asset} unusable: {reason}")]
    Benchmark {
        /// Benchmark column
        asset: String,
        /// What was wrong
        reason: String,
    },

    /// Data error
    #[error(transparent)]
    Data(#[from] tangent_data::DataError),

    /// Risk model error
    #[error(transparent)]
    Risk(#[from] tangent_risk::RiskError),

    /// Optimization error
    #[error(transparent)]
    Optimize(#[from] tangent_optimize::OptimizeError),
}
