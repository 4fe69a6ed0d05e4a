//! First and second moments of a set of asset returns.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tangent_data::ReturnSeries;

use crate::{
    covariance::{CovarianceEstimator, SampleCovariance, is_symmetric},
    error::{Result, RiskError},
    metrics::{self, PortfolioStats, TRADING_DAYS_PER_YEAR},
};

/// Per-period mean returns and covariance of an ordered asset universe.
///
/// Every optimizer problem consumes one of these. The mean vector may be
/// replaced (for example by Black-Litterman posterior returns) while the
/// covariance stays the historical estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMoments {
    assets: Vec<String>,
    mean: Array1<f64>,
    covariance: Array2<f64>,
    periods_per_year: f64,
}

impl AssetMoments {
    /// Build moments from explicit parts.
    ///
    /// # Arguments
    /// * `assets` - Asset identifiers, defining the weight order
    /// * `mean` - Per-period mean return of each asset
    /// * `covariance` - Symmetric per-period covariance matrix
    ///
    /// The annualisation factor defaults to [`TRADING_DAYS_PER_YEAR`].
    pub fn new(assets: Vec<String>, mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        let n = assets.len();
        if mean.len() != n {
            return Err(RiskError::DimensionMismatch {
                expected: n,
                actual: mean.len(),
            });
        }
        if covariance.dim() != (n, n) {
            return Err(RiskError::DimensionMismatch {
                expected: n,
                actual: covariance.nrows().max(covariance.ncols()),
            });
        }
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(RiskError::MissingValues);
        }
        if !is_symmetric(&covariance, 1e-10) {
            return Err(RiskError::InvalidParameter(
                "covariance matrix must be symmetric".to_string(),
            ));
        }

        Ok(Self {
            assets,
            mean,
            covariance,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        })
    }

    /// Estimate moments from a complete return series.
    ///
    /// The mean is the arithmetic per-period mean; the covariance comes from
    /// `estimator`.
    pub fn from_returns<E>(returns: &ReturnSeries, estimator: &E) -> Result<Self>
    where
        E: CovarianceEstimator + ?Sized,
    {
        if returns.len() < 2 {
            return Err(RiskError::InsufficientData {
                required: 2,
                actual: returns.len(),
            });
        }
        if !returns.is_complete() {
            return Err(RiskError::MissingValues);
        }
        let mean = returns.mean()?;
        let covariance = estimator.estimate(returns.values())?;
        Self::new(returns.assets().to_vec(), mean, covariance)
    }

    /// Estimate moments with the unbiased sample covariance.
    pub fn from_returns_sample(returns: &ReturnSeries) -> Result<Self> {
        Self::from_returns(returns, &SampleCovariance::default())
    }

    /// Override the annualisation factor.
    pub fn with_periods_per_year(mut self, periods_per_year: f64) -> Result<Self> {
        if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
            return Err(RiskError::InvalidParameter(format!(
                "periods per year must be positive, got {periods_per_year}"
            )));
        }
        self.periods_per_year = periods_per_year;
        Ok(self)
    }

    /// Replace the mean vector, keeping assets and covariance.
    pub fn with_mean(mut self, mean: Array1<f64>) -> Result<Self> {
        if mean.len() != self.assets.len() {
            return Err(RiskError::DimensionMismatch {
                expected: self.assets.len(),
                actual: mean.len(),
            });
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::MissingValues);
        }
        self.mean = mean;
        Ok(self)
    }

    /// Asset identifiers.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Per-period mean returns.
    pub const fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Per-period covariance matrix.
    pub const fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Annualisation factor.
    pub const fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the universe is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    fn check_weights(&self, weights: &Array1<f64>) -> Result<()> {
        if weights.len() != self.assets.len() {
            return Err(RiskError::DimensionMismatch {
                expected: self.assets.len(),
                actual: weights.len(),
            });
        }
        Ok(())
    }

    /// Annualised portfolio return.
    pub fn portfolio_return(&self, weights: &Array1<f64>) -> Result<f64> {
        self.check_weights(weights)?;
        Ok(metrics::portfolio_return(
            weights,
            &self.mean,
            self.periods_per_year,
        ))
    }

    /// Annualised portfolio variance.
    pub fn portfolio_variance(&self, weights: &Array1<f64>) -> Result<f64> {
        self.check_weights(weights)?;
        Ok(metrics::portfolio_variance(
            weights,
            &self.covariance,
            self.periods_per_year,
        ))
    }

    /// Annualised portfolio standard deviation.
    pub fn portfolio_stddev(&self, weights: &Array1<f64>) -> Result<f64> {
        self.check_weights(weights)?;
        Ok(metrics::portfolio_stddev(
            weights,
            &self.covariance,
            self.periods_per_year,
        ))
    }

    /// Annualised Sharpe ratio; errors on zero volatility.
    pub fn portfolio_sharpe(&self, weights: &Array1<f64>, risk_free_rate: f64) -> Result<f64> {
        self.check_weights(weights)?;
        metrics::portfolio_sharpe(
            weights,
            &self.mean,
            &self.covariance,
            risk_free_rate,
            self.periods_per_year,
        )
    }

    /// Risk-aversion utility `R - (λ/2) s`.
    pub fn portfolio_utility(&self, weights: &Array1<f64>, risk_aversion: f64) -> Result<f64> {
        self.check_weights(weights)?;
        Ok(metrics::portfolio_utility(
            weights,
            &self.mean,
            &self.covariance,
            risk_aversion,
            self.periods_per_year,
        ))
    }

    /// Return, standard deviation and Sharpe ratio in one pass.
    pub fn stats(&self, weights: &Array1<f64>, risk_free_rate: f64) -> Result<PortfolioStats> {
        Ok(PortfolioStats::new(
            self.portfolio_return(weights)?,
            self.portfolio_stddev(weights)?,
            risk_free_rate,
        ))
    }

    /// Annualised mean return of every asset.
    pub fn annualized_returns(&self) -> Array1<f64> {
        metrics::annualized_asset_returns(&self.mean, self.periods_per_year)
    }
}
