//! Asset covariance estimation
//!
//! Estimators turn a matrix of period returns (rows are periods, columns are
//! assets) into a per-period covariance matrix Σ. The optimizer annualises
//! Σ itself, so estimators never scale by the number of periods per year.

pub mod ledoit_wolf;
pub mod utils;

pub use ledoit_wolf::{LedoitWolfConfig, LedoitWolfEstimator, ShrinkageTarget};
pub use utils::{
    EigenDecomposition, cholesky, condition_number, invert_spd, is_positive_definite,
    is_symmetric, jacobi_eigendecomp,
};

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during covariance estimation
#[derive(Debug, Error)]
pub enum CovarianceError {
    /// Insufficient data for estimation
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Matrix is singular or not positive definite
    #[error("Matrix is singular or not positive definite (condition number {condition_number:e})")]
    SingularMatrix {
        /// Ratio of largest to smallest absolute eigenvalue
        condition_number: f64,
    },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Returns contain missing or non-finite values
    #[error("Returns contain missing or non-finite values")]
    NonFiniteInput,
}

/// Trait for covariance matrix estimators
pub trait CovarianceEstimator {
    /// Estimate the covariance matrix from asset returns
    ///
    /// # Arguments
    /// * `returns` - Matrix where each row is a period and each column an asset
    ///
    /// # Returns
    /// * Estimated per-period covariance matrix (N x N for N assets)
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError>;
}

fn check_returns(returns: &Array2<f64>, min_observations: usize) -> Result<(), CovarianceError> {
    if returns.nrows() < min_observations {
        return Err(CovarianceError::InsufficientData {
            required: min_observations,
            actual: returns.nrows(),
        });
    }
    if returns.iter().any(|v| !v.is_finite()) {
        return Err(CovarianceError::NonFiniteInput);
    }
    Ok(())
}

fn centered(returns: &Array2<f64>) -> Array2<f64> {
    match returns.mean_axis(Axis(0)) {
        Some(means) => returns - &means.insert_axis(Axis(0)),
        None => returns.clone(),
    }
}

/// Unbiased sample covariance
///
/// `S = XᵀX / (T - ddof)` over mean-centred returns `X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCovariance {
    /// Delta degrees of freedom (default: 1)
    pub ddof: usize,
}

impl Default for SampleCovariance {
    fn default() -> Self {
        Self { ddof: 1 }
    }
}

impl SampleCovariance {
    /// Sample covariance with the given degrees-of-freedom correction
    pub const fn new(ddof: usize) -> Self {
        Self { ddof }
    }
}

impl CovarianceEstimator for SampleCovariance {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        check_returns(returns, self.ddof + 1)?;
        let x = centered(returns);
        let denom = (returns.nrows() - self.ddof) as f64;
        Ok(x.t().dot(&x) / denom)
    }
}

/// Serializable choice of covariance estimator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CovarianceMethod {
    /// Unbiased sample covariance
    #[default]
    Sample,
    /// Ledoit-Wolf shrinkage
    LedoitWolf(LedoitWolfConfig),
}

impl CovarianceEstimator for CovarianceMethod {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        match self {
            Self::Sample => SampleCovariance::default().estimate(returns),
            Self::LedoitWolf(config) => LedoitWolfEstimator::new(*config).estimate(returns),
        }
    }
}
