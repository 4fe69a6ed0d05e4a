//! Anchor portfolios of the efficient frontier
//!
//! The minimum standard deviation, maximum Sharpe and maximum return
//! portfolios bound the frontier and drive the risk dial.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tangent_risk::PortfolioStats;

use crate::{
    error::Result,
    optimizer::{OptimizationResult, PortfolioOptimizer},
    solver::Solver,
};

/// A solved anchor with its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPortfolio {
    /// Portfolio weights in asset order
    pub weights: Array1<f64>,
    /// Annualised return, standard deviation and Sharpe ratio
    pub stats: PortfolioStats,
}

impl AnchorPortfolio {
    fn from_result<S: Solver>(
        optimizer: &PortfolioOptimizer<'_, S>,
        result: OptimizationResult,
        risk_free_rate: f64,
    ) -> Result<Self> {
        let result = result.into_checked()?;
        let stats = optimizer.moments().stats(&result.weights, risk_free_rate)?;
        Ok(Self {
            weights: result.weights,
            stats,
        })
    }
}

/// The three anchor portfolios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchors {
    /// Minimum standard deviation portfolio
    pub min_stddev: AnchorPortfolio,
    /// Maximum Sharpe ratio portfolio
    pub max_sharpe: AnchorPortfolio,
    /// Maximum return portfolio
    pub max_return: AnchorPortfolio,
}

impl Anchors {
    /// Solve all three anchors.
    ///
    /// Any solver failure is returned as [`OptimizeError::SolverFailed`](crate::OptimizeError::SolverFailed).
    pub fn compute<S: Solver>(
        optimizer: &PortfolioOptimizer<'_, S>,
        risk_free_rate: f64,
    ) -> Result<Self> {
        Ok(Self {
            min_stddev: AnchorPortfolio::from_result(
                optimizer,
                optimizer.min_stddev()?,
                risk_free_rate,
            )?,
            max_sharpe: AnchorPortfolio::from_result(
                optimizer,
                optimizer.max_sharpe(risk_free_rate)?,
                risk_free_rate,
            )?,
            max_return: AnchorPortfolio::from_result(
                optimizer,
                optimizer.max_return()?,
                risk_free_rate,
            )?,
        })
    }

    /// Anchors paired with their labels, lowest risk first.
    pub fn labelled(&self) -> [(&'static str, &AnchorPortfolio); 3] {
        [
            ("min_stddev", &self.min_stddev),
            ("max_sharpe", &self.max_sharpe),
            ("max_return", &self.max_return),
        ]
    }
}
