//! Efficient frontier construction
//!
//! The curve is traced by solving the efficient-return problem on an evenly
//! spaced grid of target returns, from the minimum standard deviation
//! portfolio's return up to an upper bound. Random feasible portfolios are
//! drawn alongside for plotting; they never feed the solves.

use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tangent_risk::{AssetMoments, metrics};
use tracing::info;

use crate::{
    anchors::Anchors,
    bounds::Bounds,
    error::Result,
    optimizer::PortfolioOptimizer,
    solver::Solver,
};

/// Where the target-return sweep ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontierUpperBound {
    /// Return of the maximum return portfolio
    #[default]
    MaxReturn,
    /// Highest return among the random samples
    SampledMax,
}

/// Configuration for [`FrontierBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontierConfig {
    /// Number of target returns on the curve (default: 50)
    pub points: usize,

    /// Number of random portfolios to sample (default: 30000)
    pub samples: usize,

    /// Seed for the sampler; entropy when absent
    pub seed: Option<u64>,

    /// End of the target sweep (default: maximum return portfolio)
    pub upper_bound: FrontierUpperBound,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            points: 50,
            samples: 30_000,
            seed: None,
            upper_bound: FrontierUpperBound::default(),
        }
    }
}

/// One point of the frontier curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Requested annual return
    pub target_return: f64,
    /// Achieved annual standard deviation
    pub stddev: f64,
    /// Whether the solve met its tolerances
    pub success: bool,
    /// Portfolio weights
    pub weights: Array1<f64>,
}

/// A randomly drawn feasible portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePortfolio {
    /// Portfolio weights
    pub weights: Array1<f64>,
    /// Annual expected return
    pub expected_return: f64,
    /// Annual standard deviation
    pub stddev: f64,
    /// Sharpe ratio, `None` for zero volatility
    pub sharpe: Option<f64>,
}

/// Curve, samples and anchors of one frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontier {
    /// Efficient portfolios in increasing target return
    pub curve: Vec<FrontierPoint>,
    /// Random feasible portfolios
    pub samples: Vec<SamplePortfolio>,
    /// Minimum standard deviation, maximum Sharpe and maximum return portfolios
    pub anchors: Anchors,
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Solve the efficient-return problem at each target.
///
/// Points whose solve misses tolerance are kept with `success = false`.
///
/// # Errors
/// Returns [`OptimizeError::TargetOutOfRange`](crate::OptimizeError::TargetOutOfRange)
/// if any target is unreachable under the optimizer's bounds.
pub fn frontier_curve<S: Solver>(
    optimizer: &PortfolioOptimizer<'_, S>,
    targets: &[f64],
) -> Result<Vec<FrontierPoint>> {
    targets
        .iter()
        .map(|&target| {
            let result = optimizer.efficient_return(target)?;
            Ok(FrontierPoint {
                target_return: target,
                stddev: optimizer.moments().portfolio_stddev(&result.weights)?,
                success: result.success,
                weights: result.weights,
            })
        })
        .collect()
}

/// Draw `count` random feasible portfolios and evaluate them.
///
/// Weights are uniform draws normalised to sum to one, then projected onto
/// `bounds` (a no-op for the default `[0, 1]` bounds).
pub fn sample_portfolios<R: Rng + ?Sized>(
    moments: &AssetMoments,
    bounds: &Bounds,
    count: usize,
    risk_free_rate: f64,
    rng: &mut R,
) -> Vec<SamplePortfolio> {
    let n = moments.len();
    let periods = moments.periods_per_year();
    (0..count)
        .map(|_| {
            let raw = Array1::from_shape_fn(n, |_| rng.gen_range(0.0..1.0));
            let total = raw.sum();
            let normalized = if total > 0.0 {
                raw / total
            } else {
                Array1::from_elem(n, 1.0 / n as f64)
            };
            let weights = bounds.project(&normalized);
            let expected_return = metrics::portfolio_return(&weights, moments.mean(), periods);
            let stddev = metrics::portfolio_stddev(&weights, moments.covariance(), periods);
            SamplePortfolio {
                sharpe: metrics::sharpe(expected_return, stddev, risk_free_rate).ok(),
                weights,
                expected_return,
                stddev,
            }
        })
        .collect()
}

/// Builds a [`Frontier`] from an optimizer.
#[derive(Debug)]
pub struct FrontierBuilder<'o, 'a, S> {
    optimizer: &'o PortfolioOptimizer<'a, S>,
    config: FrontierConfig,
}

impl<'o, 'a, S: Solver> FrontierBuilder<'o, 'a, S> {
    /// Create a builder.
    pub const fn new(optimizer: &'o PortfolioOptimizer<'a, S>, config: FrontierConfig) -> Self {
        Self { optimizer, config }
    }

    /// Solve the anchors, draw the samples and trace the curve.
    pub fn build(&self, risk_free_rate: f64) -> Result<Frontier> {
        let anchors = Anchors::compute(self.optimizer, risk_free_rate)?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples = sample_portfolios(
            self.optimizer.moments(),
            self.optimizer.bounds(),
            self.config.samples,
            risk_free_rate,
            &mut rng,
        );

        let lower = anchors.min_stddev.stats.expected_return;
        let upper = match self.config.upper_bound {
            FrontierUpperBound::MaxReturn => anchors.max_return.stats.expected_return,
            FrontierUpperBound::SampledMax => samples
                .iter()
                .map(|s| s.expected_return)
                .reduce(f64::max)
                .unwrap_or(anchors.max_return.stats.expected_return),
        };
        let targets = linspace(lower, upper.max(lower), self.config.points);
        let curve = frontier_curve(self.optimizer, &targets)?;

        let failed = curve.iter().filter(|p| !p.success).count();
        info!(
            points = curve.len(),
            failed,
            samples = samples.len(),
            lower,
            upper,
            "Built efficient frontier"
        );

        Ok(Frontier {
            curve,
            samples,
            anchors,
        })
    }
}
