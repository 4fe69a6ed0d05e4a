#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod black_litterman;
pub mod covariance;
pub mod error;
pub mod expected_returns;
pub mod metrics;
pub mod moments;
pub mod views;

// Re-export main types
pub use black_litterman::{BlackLitterman, BlackLittermanConfig, BlackLittermanEstimate};
pub use covariance::{
    CovarianceError, CovarianceEstimator, CovarianceMethod, LedoitWolfConfig, LedoitWolfEstimator,
    SampleCovariance, ShrinkageTarget,
};
pub use error::{Result, RiskError, ViewError};
pub use expected_returns::{BlackLittermanReturns, ExpectedReturns, HistoricalMean};
pub use metrics::{PortfolioStats, TRADING_DAYS_PER_YEAR};
pub use moments::AssetMoments;
pub use views::{View, ViewMatrices};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
