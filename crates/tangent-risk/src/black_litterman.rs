//! Black-Litterman posterior expected returns
//!
//! Given market weights w_m, per-period moments (μ, Σ), a risk-free rate r_f
//! and views (P, Q):
//!
//! 1. Implied risk aversion: δ = (R(w_m) - r_f) / V(w_m), both annualised
//! 2. Equilibrium returns: π = δ Σ w_m
//! 3. View uncertainty: Ω = τ P Σ Pᵀ
//! 4. Posterior: π_adj = [(τΣ)⁻¹ + PᵀΩ⁻¹P]⁻¹ [(τΣ)⁻¹π + PᵀΩ⁻¹Q]
//!
//! With no views the posterior is π itself.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{
    covariance::{CovarianceError, condition_number, invert_spd},
    error::{Result, RiskError},
    moments::AssetMoments,
    views::{View, ViewMatrices},
};

/// Black-Litterman configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackLittermanConfig {
    /// Scale of the uncertainty in the equilibrium estimate (default: 0.025)
    pub tau: f64,

    /// Largest condition number accepted before a matrix is treated as
    /// singular (default: 1e12)
    pub max_condition_number: f64,
}

impl Default for BlackLittermanConfig {
    fn default() -> Self {
        Self {
            tau: 0.025,
            max_condition_number: 1e12,
        }
    }
}

/// Output of a posterior computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackLittermanEstimate {
    /// Implied risk-aversion coefficient δ
    pub risk_aversion: f64,
    /// Per-period equilibrium returns π
    pub equilibrium: Array1<f64>,
    /// Per-period posterior returns π_adj
    pub posterior: Array1<f64>,
}

/// Black-Litterman estimator
#[derive(Debug, Clone, Default)]
pub struct BlackLitterman {
    config: BlackLittermanConfig,
}

impl BlackLitterman {
    /// Create a new estimator with the given configuration
    pub const fn new(config: BlackLittermanConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub const fn config(&self) -> &BlackLittermanConfig {
        &self.config
    }

    /// Implied risk aversion of the market portfolio
    ///
    /// # Arguments
    /// * `moments` - Historical moments of the universe
    /// * `market_weights` - Market-cap weights summing to 1, in `moments` order
    /// * `risk_free_rate` - Annual risk-free rate
    pub fn implied_risk_aversion(
        &self,
        moments: &AssetMoments,
        market_weights: &Array1<f64>,
        risk_free_rate: f64,
    ) -> Result<f64> {
        let variance = moments.portfolio_variance(market_weights)?;
        if variance <= 0.0 {
            return Err(RiskError::ZeroMarketVariance);
        }
        Ok((moments.portfolio_return(market_weights)? - risk_free_rate) / variance)
    }

    /// Equilibrium returns π = δ Σ w_m (per period)
    pub fn equilibrium_returns(
        &self,
        moments: &AssetMoments,
        market_weights: &Array1<f64>,
        risk_free_rate: f64,
    ) -> Result<Array1<f64>> {
        let delta = self.implied_risk_aversion(moments, market_weights, risk_free_rate)?;
        Ok(moments.covariance().dot(market_weights) * delta)
    }

    /// Posterior returns blending equilibrium returns with views
    pub fn estimate(
        &self,
        moments: &AssetMoments,
        market_weights: &Array1<f64>,
        risk_free_rate: f64,
        views: &[View],
    ) -> Result<BlackLittermanEstimate> {
        if !(self.config.tau > 0.0 && self.config.tau.is_finite()) {
            return Err(RiskError::InvalidParameter(format!(
                "tau must be positive, got {}",
                self.config.tau
            )));
        }

        let risk_aversion = self.implied_risk_aversion(moments, market_weights, risk_free_rate)?;
        let equilibrium = moments.covariance().dot(market_weights) * risk_aversion;

        if views.is_empty() {
            return Ok(BlackLittermanEstimate {
                risk_aversion,
                posterior: equilibrium.clone(),
                equilibrium,
            });
        }

        let matrices = ViewMatrices::build(views, moments.assets(), moments.periods_per_year())?;
        let posterior = self.posterior(moments.covariance(), &equilibrium, &matrices)?;
        tracing::debug!(
            views = matrices.len(),
            risk_aversion,
            "black-litterman posterior computed"
        );

        Ok(BlackLittermanEstimate {
            risk_aversion,
            equilibrium,
            posterior,
        })
    }

    fn posterior(
        &self,
        covariance: &Array2<f64>,
        equilibrium: &Array1<f64>,
        views: &ViewMatrices,
    ) -> Result<Array1<f64>> {
        let tau = self.config.tau;
        let p = &views.pick;

        let tau_sigma = covariance * tau;
        let omega = p.dot(&tau_sigma).dot(&p.t());

        let tau_sigma_inv = self.invert(&tau_sigma, "scaled covariance (tau * sigma)")?;
        let omega_inv = self.invert(&omega, "view uncertainty (omega)")?;

        let pt_omega_inv = p.t().dot(&omega_inv);
        let precision = &tau_sigma_inv + &pt_omega_inv.dot(p);
        let rhs = tau_sigma_inv.dot(equilibrium) + pt_omega_inv.dot(&views.returns);

        let precision_inv = self.invert(&precision, "posterior precision")?;
        Ok(precision_inv.dot(&rhs))
    }

    fn invert(&self, matrix: &Array2<f64>, name: &'static str) -> Result<Array2<f64>> {
        let cond = condition_number(matrix);
        if cond > self.config.max_condition_number {
            return Err(RiskError::SingularMatrix {
                matrix: name,
                condition_number: cond,
            });
        }
        invert_spd(matrix).map_err(|e| match e {
            CovarianceError::SingularMatrix { condition_number } => RiskError::SingularMatrix {
                matrix: name,
                condition_number,
            },
            other => other.into(),
        })
    }
}
