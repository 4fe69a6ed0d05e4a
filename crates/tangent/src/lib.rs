#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod advisor;
pub mod backtest;
pub mod error;

// Re-export main types from sub-crates
pub use tangent_data as data;
pub use tangent_optimize as optimize;
pub use tangent_output as output;
pub use tangent_risk as risk;

pub use advisor::{Advisor, AdvisorConfig, AdvisorRequest, Recommendation};
pub use backtest::{
    Aggregate, BacktestConfig, BacktestReport, Backtester, RoundOutcome, RoundResult, SkipReason,
    Split,
};
pub use error::{AdvisorError, BacktestError};

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
