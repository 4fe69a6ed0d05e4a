//! Risk preference to target return mapping
//!
//! A risk factor `r ∈ [0, 1]` is mapped piecewise-linearly across three
//! anchor returns:
//!
//! ```text
//! r ∈ [0, 0.5]:  bottom + (middle - bottom) · 2r
//! r ∈ [0.5, 1]:  middle + (top - middle) · 2(r - 0.5)
//! ```
//!
//! with `bottom`, `middle` and `top` the returns of the minimum standard
//! deviation, maximum Sharpe and maximum return portfolios. The anchors are
//! used as found; when they are not ordered the mapping is not monotone and
//! a warning is logged.

use serde::{Deserialize, Serialize};
use tangent_risk::PortfolioStats;
use tracing::{debug, warn};

use crate::{
    anchors::Anchors,
    error::{OptimizeError, Result},
    optimizer::{OptimizationResult, PortfolioOptimizer},
    solver::Solver,
};

/// The three anchor returns of the dial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskDial {
    /// Annual return at `r = 0`
    pub bottom: f64,
    /// Annual return at `r = 0.5`
    pub middle: f64,
    /// Annual return at `r = 1`
    pub top: f64,
}

impl RiskDial {
    /// Dial from explicit anchor returns.
    pub const fn new(bottom: f64, middle: f64, top: f64) -> Self {
        Self {
            bottom,
            middle,
            top,
        }
    }

    /// Dial from solved anchor portfolios.
    pub const fn from_anchors(anchors: &Anchors) -> Self {
        Self::new(
            anchors.min_stddev.stats.expected_return,
            anchors.max_sharpe.stats.expected_return,
            anchors.max_return.stats.expected_return,
        )
    }

    /// Whether `bottom <= middle <= top`.
    pub fn anchors_ordered(&self) -> bool {
        self.bottom <= self.middle && self.middle <= self.top
    }

    /// Target annual return for `risk_factor`.
    pub fn target_return(&self, risk_factor: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&risk_factor) {
            return Err(OptimizeError::InvalidRiskFactor(risk_factor));
        }
        Ok(if risk_factor <= 0.5 {
            self.bottom + (self.middle - self.bottom) * (2.0 * risk_factor)
        } else {
            self.middle + (self.top - self.middle) * (2.0 * (risk_factor - 0.5))
        })
    }

    /// Resolve `risk_factor` to an efficient portfolio.
    ///
    /// Solves the anchors, maps the factor to a target return and solves the
    /// efficient-return problem at that target.
    pub fn resolve<S: Solver>(
        optimizer: &PortfolioOptimizer<'_, S>,
        risk_factor: f64,
        risk_free_rate: f64,
    ) -> Result<RiskDialResult> {
        if !(0.0..=1.0).contains(&risk_factor) {
            return Err(OptimizeError::InvalidRiskFactor(risk_factor));
        }
        let anchors = Anchors::compute(optimizer, risk_free_rate)?;
        let dial = Self::from_anchors(&anchors);
        let anchors_ordered = dial.anchors_ordered();
        if !anchors_ordered {
            warn!(
                bottom = dial.bottom,
                middle = dial.middle,
                top = dial.top,
                "Risk dial anchors are not ordered; target return is not monotone in the risk factor"
            );
        }

        let target_return = dial.target_return(risk_factor)?;
        debug!(risk_factor, target_return, "Resolved risk dial target");
        let allocation = optimizer.efficient_return(target_return)?.into_checked()?;
        let stats = optimizer.moments().stats(&allocation.weights, risk_free_rate)?;

        Ok(RiskDialResult {
            risk_factor,
            target_return,
            anchors_ordered,
            anchors,
            allocation,
            stats,
        })
    }
}

/// Portfolio chosen by the risk dial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDialResult {
    /// Requested risk factor
    pub risk_factor: f64,
    /// Interpolated annual target return
    pub target_return: f64,
    /// Whether the anchor returns were ordered
    pub anchors_ordered: bool,
    /// Anchor portfolios used for the interpolation
    pub anchors: Anchors,
    /// Efficient-return solve at the target
    pub allocation: OptimizationResult,
    /// Metrics of the chosen portfolio
    pub stats: PortfolioStats,
}
