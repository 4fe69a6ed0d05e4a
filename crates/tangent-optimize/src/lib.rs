#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod anchors;
pub mod bounds;
pub mod error;
pub mod frontier;
pub mod objective;
pub mod optimizer;
pub mod risk_dial;
pub mod solver;

// Re-export main types
pub use anchors::{AnchorPortfolio, Anchors};
pub use bounds::{BoundOverride, Bounds};
pub use error::{OptimizeError, Result};
pub use frontier::{
    Frontier, FrontierBuilder, FrontierConfig, FrontierPoint, FrontierUpperBound,
    SamplePortfolio, frontier_curve, sample_portfolios,
};
pub use optimizer::{OptimizationResult, PortfolioOptimizer, PortfolioProblem};
pub use risk_dial::{RiskDial, RiskDialResult};
pub use solver::{AugmentedLagrangian, Solver, SolverConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
