//! Portfolio risk and return metrics
//!
//! For weights w, per-period mean returns μ, per-period covariance Σ and
//! A periods per year:
//!
//! - return: R = A · μᵀw
//! - variance: V = A · wᵀΣw
//! - standard deviation: s = √V
//! - Sharpe ratio: (R - r_f) / s
//! - utility: R - (λ/2) · s
//!
//! The functions are pure. Callers are responsible for matching lengths;
//! [`AssetMoments`](crate::AssetMoments) checks them before delegating here.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Conventional number of trading days per year.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Standard deviations at or below this are treated as zero.
pub const MIN_VOLATILITY: f64 = 1e-12;

/// Annualised portfolio return `A · μᵀw`.
pub fn portfolio_return(weights: &Array1<f64>, mean: &Array1<f64>, periods_per_year: f64) -> f64 {
    periods_per_year * weights.dot(mean)
}

/// Annualised portfolio variance `A · wᵀΣw`.
pub fn portfolio_variance(
    weights: &Array1<f64>,
    covariance: &Array2<f64>,
    periods_per_year: f64,
) -> f64 {
    periods_per_year * weights.dot(&covariance.dot(weights))
}

/// Annualised portfolio standard deviation.
///
/// Tiny negative variances from rounding are clamped to zero.
pub fn portfolio_stddev(
    weights: &Array1<f64>,
    covariance: &Array2<f64>,
    periods_per_year: f64,
) -> f64 {
    portfolio_variance(weights, covariance, periods_per_year)
        .max(0.0)
        .sqrt()
}

/// Sharpe ratio from an annualised return and standard deviation.
///
/// Returns [`RiskError::ZeroVolatility`] when `stddev` is (numerically) zero.
pub fn sharpe(expected_return: f64, stddev: f64, risk_free_rate: f64) -> Result<f64> {
    if stddev.is_nan() || stddev <= MIN_VOLATILITY {
        return Err(RiskError::ZeroVolatility);
    }
    Ok((expected_return - risk_free_rate) / stddev)
}

/// Annualised Sharpe ratio of a portfolio.
pub fn portfolio_sharpe(
    weights: &Array1<f64>,
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Result<f64> {
    sharpe(
        portfolio_return(weights, mean, periods_per_year),
        portfolio_stddev(weights, covariance, periods_per_year),
        risk_free_rate,
    )
}

/// Risk-aversion utility `R - (λ/2) · s`.
///
/// Larger `risk_aversion` penalises volatility more heavily.
pub fn portfolio_utility(
    weights: &Array1<f64>,
    mean: &Array1<f64>,
    covariance: &Array2<f64>,
    risk_aversion: f64,
    periods_per_year: f64,
) -> f64 {
    portfolio_return(weights, mean, periods_per_year)
        - risk_aversion / 2.0 * portfolio_stddev(weights, covariance, periods_per_year)
}

/// Per-asset annualised mean returns `A · μᵢ`.
pub fn annualized_asset_returns(mean: &Array1<f64>, periods_per_year: f64) -> Array1<f64> {
    mean * periods_per_year
}

/// Annualised return, standard deviation and Sharpe ratio of one portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Annualised expected return
    pub expected_return: f64,
    /// Annualised standard deviation
    pub stddev: f64,
    /// Sharpe ratio, `None` when the standard deviation is zero
    pub sharpe: Option<f64>,
}

impl PortfolioStats {
    /// Stats from an annualised return and standard deviation.
    pub fn new(expected_return: f64, stddev: f64, risk_free_rate: f64) -> Self {
        Self {
            expected_return,
            stddev,
            sharpe: sharpe(expected_return, stddev, risk_free_rate).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn two_assets() -> (Array1<f64>, Array2<f64>) {
        (
            array![0.001, 0.002],
            array![[0.0004, 0.0001], [0.0001, 0.0009]],
        )
    }

    #[test]
    fn test_return_and_variance() {
        let (mean, cov) = two_assets();
        let w = array![0.5, 0.5];
        assert_relative_eq!(portfolio_return(&w, &mean, 252.0), 0.378, epsilon = 1e-12);
        // wᵀΣw = 0.25 * (0.0004 + 0.0009 + 2 * 0.0001) = 0.000375
        assert_relative_eq!(portfolio_variance(&w, &cov, 252.0), 0.0945, epsilon = 1e-12);
        assert_relative_eq!(
            portfolio_stddev(&w, &cov, 252.0),
            0.0945_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sharpe_and_utility() {
        let (mean, cov) = two_assets();
        let w = array![0.5, 0.5];
        let s = 0.0945_f64.sqrt();
        assert_relative_eq!(
            portfolio_sharpe(&w, &mean, &cov, 0.02, 252.0).unwrap(),
            (0.378 - 0.02) / s,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            portfolio_utility(&w, &mean, &cov, 3.0, 252.0),
            0.378 - 1.5 * s,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            portfolio_utility(&w, &mean, &cov, 0.0, 252.0),
            portfolio_return(&w, &mean, 252.0)
        );
    }

    #[test]
    fn test_zero_volatility() {
        let mean = array![0.001];
        let cov = array![[0.0]];
        let w = array![1.0];
        assert_relative_eq!(portfolio_stddev(&w, &cov, 252.0), 0.0);
        assert!(matches!(
            portfolio_sharpe(&w, &mean, &cov, 0.0, 252.0),
            Err(RiskError::ZeroVolatility)
        ));
        assert_eq!(PortfolioStats::new(0.1, 0.0, 0.0).sharpe, None);
    }

    #[test]
    fn test_annualized_asset_returns() {
        let r = annualized_asset_returns(&array![0.001, -0.0005], TRADING_DAYS_PER_YEAR);
        assert_relative_eq!(r[0], 0.252, epsilon = 1e-12);
        assert_relative_eq!(r[1], -0.126, epsilon = 1e-12);
    }
}
