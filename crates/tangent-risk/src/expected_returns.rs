//! Expected-return estimators
//!
//! The optimizer takes μ from [`AssetMoments`]; an [`ExpectedReturns`]
//! implementation decides what μ should be for a given historical window.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tangent_data::MarketCaps;

use crate::{
    black_litterman::{BlackLitterman, BlackLittermanConfig},
    error::Result,
    moments::AssetMoments,
    views::View,
};

/// Produces per-period expected returns for the assets of `moments`.
pub trait ExpectedReturns {
    /// Expected returns in `moments.assets()` order
    ///
    /// # Arguments
    /// * `moments` - Historical moments of the window
    /// * `risk_free_rate` - Annual risk-free rate
    fn expected_returns(&self, moments: &AssetMoments, risk_free_rate: f64) -> Result<Array1<f64>>;

    /// `moments` with μ replaced by [`Self::expected_returns`]
    fn apply(&self, moments: AssetMoments, risk_free_rate: f64) -> Result<AssetMoments> {
        let mean = self.expected_returns(&moments, risk_free_rate)?;
        moments.with_mean(mean)
    }
}

/// Historical arithmetic mean returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalMean;

impl ExpectedReturns for HistoricalMean {
    fn expected_returns(&self, moments: &AssetMoments, _risk_free_rate: f64) -> Result<Array1<f64>> {
        Ok(moments.mean().clone())
    }
}

/// Black-Litterman posterior returns from market caps and views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlackLittermanReturns {
    /// Market capitalisation of every asset that may appear in a window
    pub market_caps: MarketCaps,
    /// Investor views
    pub views: Vec<View>,
    /// Model parameters
    #[serde(default)]
    pub config: BlackLittermanConfig,
}

impl BlackLittermanReturns {
    /// Create an estimator from caps and views with default parameters
    pub fn new(market_caps: MarketCaps, views: Vec<View>) -> Self {
        Self {
            market_caps,
            views,
            config: BlackLittermanConfig::default(),
        }
    }
}

impl ExpectedReturns for BlackLittermanReturns {
    fn expected_returns(&self, moments: &AssetMoments, risk_free_rate: f64) -> Result<Array1<f64>> {
        let weights = self.market_caps.weights_for(moments.assets())?;
        let estimate = BlackLitterman::new(self.config).estimate(
            moments,
            &weights,
            risk_free_rate,
            &self.views,
        )?;
        Ok(estimate.posterior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn moments() -> AssetMoments {
        AssetMoments::new(
            vec!["AAPL".into(), "MSFT".into()],
            array![0.001, 0.0005],
            array![[0.0004, 0.0001], [0.0001, 0.0002]],
        )
        .unwrap()
    }

    #[test]
    fn test_historical_mean() {
        let mu = HistoricalMean.expected_returns(&moments(), 0.0).unwrap();
        assert_eq!(mu, array![0.001, 0.0005]);
    }

    #[test]
    fn test_black_litterman_returns_without_views() {
        let caps: MarketCaps = [("AAPL", 3.0), ("MSFT", 1.0)].into_iter().collect();
        let estimator = BlackLittermanReturns::new(caps, vec![]);
        let m = estimator.apply(moments(), 0.01).unwrap();

        let w = array![0.75, 0.25];
        let r = 252.0 * (0.75 * 0.001 + 0.25 * 0.0005);
        let sigma_w = array![0.75 * 0.0004 + 0.25 * 0.0001, 0.75 * 0.0001 + 0.25 * 0.0002];
        let v = 252.0 * w.dot(&sigma_w);
        let delta = (r - 0.01) / v;
        assert_relative_eq!(m.mean()[0], delta * sigma_w[0], epsilon = 1e-14);
        assert_relative_eq!(m.mean()[1], delta * sigma_w[1], epsilon = 1e-14);
    }

    #[test]
    fn test_missing_market_cap() {
        let caps: MarketCaps = [("AAPL", 3.0)].into_iter().collect();
        let estimator = BlackLittermanReturns::new(caps, vec![]);
        assert!(matches!(
            estimator.expected_returns(&moments(), 0.0),
            Err(RiskError::Data(_))
        ));
    }
}
