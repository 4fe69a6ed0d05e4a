//! Ledoit-Wolf Shrinkage Covariance Estimator
//!
//! Implements the analytical shrinkage estimator from:
//! "Honey, I Shrunk the Sample Covariance Matrix" (Ledoit & Wolf, 2004)
//!
//! The estimator has the form:
//! Σ_LW = δ* F + (1-δ*) S
//!
//! where:
//! - S is the sample covariance matrix (1/T normalisation)
//! - F is the shrinkage target
//! - δ* = clamp((π̂ - ρ̂) / (T γ̂), 0, 1)
//!
//! with π̂ the summed asymptotic variance of the entries of S, ρ̂ the part
//! of it shared with the target and γ̂ = ||F - S||²_F.
//!
//! Shrinkage keeps Σ invertible when the history is short relative to the
//! number of assets, which Black-Litterman requires.

use super::{CovarianceError, CovarianceEstimator, centered, check_returns};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Shrinkage target types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkageTarget {
    /// Identity matrix scaled by average variance: F = μ * I where μ = trace(S)/n
    #[default]
    Identity,

    /// Sample variances with a single average correlation
    ConstantCorrelation,

    /// Sample variances, zero covariances
    Diagonal,
}

/// Ledoit-Wolf covariance estimator configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedoitWolfConfig {
    /// Minimum number of observations required (default: 2)
    pub min_observations: usize,

    /// Shrinkage target type (default: Identity)
    pub target: ShrinkageTarget,

    /// Whether to center returns (subtract mean) before computing covariance
    pub center: bool,
}

impl Default for LedoitWolfConfig {
    fn default() -> Self {
        Self {
            min_observations: 2,
            target: ShrinkageTarget::Identity,
            center: true,
        }
    }
}

/// Ledoit-Wolf shrinkage covariance estimator
#[derive(Debug, Default)]
pub struct LedoitWolfEstimator {
    config: LedoitWolfConfig,
}

/// Intermediate quantities of one estimation
#[derive(Debug)]
struct Shrinkage {
    sample: Array2<f64>,
    target: Array2<f64>,
    intensity: f64,
}

impl LedoitWolfEstimator {
    /// Create a new Ledoit-Wolf estimator with the given configuration
    pub const fn new(config: LedoitWolfConfig) -> Self {
        Self { config }
    }

    fn prepared(&self, returns: &Array2<f64>) -> Array2<f64> {
        if self.config.center {
            centered(returns)
        } else {
            returns.clone()
        }
    }

    /// Compute the shrinkage target matrix F and the average correlation
    fn shrinkage_target(&self, sample: &Array2<f64>) -> (Array2<f64>, f64) {
        let n = sample.nrows();

        match self.config.target {
            ShrinkageTarget::Identity => {
                let mu = sample.diag().sum() / n as f64;
                (Array2::eye(n) * mu, 0.0)
            }
            ShrinkageTarget::Diagonal => (Array2::from_diag(&sample.diag()), 0.0),
            ShrinkageTarget::ConstantCorrelation => {
                let std_devs: Array1<f64> = sample.diag().mapv(f64::sqrt);
                let mut sum_corr = 0.0;
                let mut count = 0usize;
                for i in 0..n {
                    for j in (i + 1)..n {
                        let denom = std_devs[i] * std_devs[j];
                        if denom > 0.0 {
                            sum_corr += sample[[i, j]] / denom;
                        }
                        count += 1;
                    }
                }
                let avg_corr = if count > 0 { sum_corr / count as f64 } else { 0.0 };

                let target = Array2::from_shape_fn((n, n), |(i, j)| {
                    if i == j {
                        sample[[i, i]]
                    } else {
                        avg_corr * std_devs[i] * std_devs[j]
                    }
                });
                (target, avg_corr)
            }
        }
    }

    fn shrink(&self, returns: &Array2<f64>) -> Result<Shrinkage, CovarianceError> {
        check_returns(returns, self.config.min_observations.max(1))?;

        let y = self.prepared(returns);
        let (t_obs, n) = y.dim();
        let t = t_obs as f64;
        let sample = y.t().dot(&y) / t;
        let (target, avg_corr) = self.shrinkage_target(&sample);

        // π̂_ij = (1/T) Σ_t (y_ti y_tj - s_ij)²
        let mut pi = Array2::<f64>::zeros((n, n));
        for row in y.rows() {
            for i in 0..n {
                for j in 0..n {
                    let d = row[i] * row[j] - sample[[i, j]];
                    pi[[i, j]] += d * d;
                }
            }
        }
        pi /= t;
        let pi_hat = pi.sum();

        let rho_hat = match self.config.target {
            ShrinkageTarget::Identity => 0.0,
            ShrinkageTarget::Diagonal => pi.diag().sum(),
            ShrinkageTarget::ConstantCorrelation => {
                // θ̂_ii,ij = (1/T) Σ_t (y_ti² - s_ii)(y_ti y_tj - s_ij)
                let mut theta = Array2::<f64>::zeros((n, n));
                for row in y.rows() {
                    for i in 0..n {
                        let a = row[i] * row[i] - sample[[i, i]];
                        for j in 0..n {
                            theta[[i, j]] += a * (row[i] * row[j] - sample[[i, j]]);
                        }
                    }
                }
                theta /= t;

                let mut off = 0.0;
                for i in 0..n {
                    for j in 0..n {
                        if i == j || sample[[i, i]] <= 0.0 || sample[[j, j]] <= 0.0 {
                            continue;
                        }
                        let ratio = (sample[[j, j]] / sample[[i, i]]).sqrt();
                        off += ratio * theta[[i, j]] + theta[[j, i]] / ratio;
                    }
                }
                pi.diag().sum() + avg_corr / 2.0 * off
            }
        };

        let gamma_hat = (&sample - &target).mapv(|v| v * v).sum();
        let intensity = if gamma_hat > 0.0 {
            ((pi_hat - rho_hat) / (t * gamma_hat)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(Shrinkage {
            sample,
            target,
            intensity,
        })
    }

    /// Optimal shrinkage intensity δ* for the given returns
    pub fn shrinkage_intensity(&self, returns: &Array2<f64>) -> Result<f64, CovarianceError> {
        self.shrink(returns).map(|s| s.intensity)
    }
}

impl CovarianceEstimator for LedoitWolfEstimator {
    fn estimate(&self, returns: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
        let Shrinkage {
            sample,
            target,
            intensity,
        } = self.shrink(returns)?;
        tracing::debug!(intensity, target = ?self.config.target, "ledoit-wolf shrinkage");
        Ok(&target * intensity + &sample * (1.0 - intensity))
    }
}
