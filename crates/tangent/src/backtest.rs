//! Walk-forward backtesting
//!
//! The price table is split into a training prefix and a testing suffix.
//! Without rebalancing the maximum Sharpe portfolio of the training window
//! is held through the whole testing window. With a rebalancing period `p`
//! there are `ceil(testing_rows / p)` rounds; round `i` trains on the first
//! `training_rows + p·i` rows (only the last `training_rows` of them when
//! slicing) and is evaluated on the next `p` rows.
//!
//! Each round keeps only assets with complete prices in both of its windows.
//! A round with an empty window, fewer than two common assets, or fewer than
//! two returns in either window is skipped. Realised return and standard
//! deviation are measured on the testing window's own moments and averaged
//! across evaluated rounds weighted by testing-window length.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tangent_data::PriceTable;
use tangent_optimize::{PortfolioOptimizer, SolverConfig};
use tangent_output::{Allocation, AllocationSnapshot};
use tangent_risk::{AssetMoments, CovarianceMethod, ExpectedReturns, PortfolioStats};
use tracing::{debug, info, warn};

use crate::error::BacktestError;

/// Result type for backtests.
pub type Result<T> = std::result::Result<T, BacktestError>;

/// How the price table is split; the other window takes the remaining rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// First `n` rows train
    Training(usize),
    /// Last `n` rows test
    Testing(usize),
}

impl Split {
    /// Number of training rows for a table of `rows` rows.
    ///
    /// # Errors
    /// [`BacktestError::InvalidSplit`] if either window would be empty.
    pub const fn training_rows(&self, rows: usize) -> Result<usize> {
        let (length, training) = match *self {
            Self::Training(n) => (n, n),
            Self::Testing(n) => (n, rows.saturating_sub(n)),
        };
        if length == 0 || length >= rows {
            return Err(BacktestError::InvalidSplit { length, rows });
        }
        Ok(training)
    }
}

impl Default for Split {
    fn default() -> Self {
        Self::Testing(252)
    }
}

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Training/testing split (default: last 252 rows test)
    pub split: Split,

    /// Rows between rebalances; a single buy-and-hold window when absent
    pub rebalancing_period: Option<usize>,

    /// Train on a sliding window of constant length instead of an expanding one
    pub slicing: bool,

    /// Annual risk-free rate for the Sharpe objective and reported ratios
    pub risk_free_rate: f64,

    /// Covariance estimator for the training windows
    pub covariance: CovarianceMethod,

    /// Solver tolerances
    pub solver: SolverConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            split: Split::default(),
            rebalancing_period: None,
            slicing: false,
            risk_free_rate: 0.0,
            covariance: CovarianceMethod::default(),
            solver: SolverConfig::default(),
        }
    }
}

/// Why a round was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Training or testing window has no rows
    EmptyWindow,
    /// Fewer than two assets have complete prices in both windows
    InsufficientAssets {
        /// Assets usable in the round
        available: usize,
    },
    /// A window has fewer than two returns
    InsufficientObservations {
        /// Returns in the training window
        training: usize,
        /// Returns in the testing window
        testing: usize,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWindow => write!(f, "empty training or testing window"),
            Self::InsufficientAssets { available } => {
                write!(f, "only {available} asset(s) with complete data")
            }
            Self::InsufficientObservations { training, testing } => write!(
                f,
                "too few returns ({training} training, {testing} testing)"
            ),
        }
    }
}

/// Realised performance of one evaluated round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Zero-based round index
    pub round: usize,
    /// Price rows in the training window
    pub training_days: usize,
    /// Price rows in the testing window; the round's aggregation weight
    pub testing_days: usize,
    /// Annualised realised return, standard deviation and Sharpe ratio
    pub stats: PortfolioStats,
    /// Whether the maximum Sharpe solve met its tolerances
    pub converged: bool,
    /// Holdings bought at the end of the training window
    pub allocation: AllocationSnapshot,
}

/// Disposition of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RoundOutcome {
    /// Round was solved and evaluated
    Evaluated(RoundResult),
    /// Round was skipped for data quality
    Skipped {
        /// Zero-based round index
        round: usize,
        /// Why
        #[serde(flatten)]
        reason: SkipReason,
    },
}

impl RoundOutcome {
    /// Zero-based round index.
    pub const fn round(&self) -> usize {
        match self {
            Self::Evaluated(result) => result.round,
            Self::Skipped { round, .. } => *round,
        }
    }

    /// Result of an evaluated round.
    pub const fn as_evaluated(&self) -> Option<&RoundResult> {
        match self {
            Self::Evaluated(result) => Some(result),
            Self::Skipped { .. } => None,
        }
    }
}

/// Length-weighted performance across evaluated rounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Aggregate {
    /// At least one round was evaluated
    Evaluated {
        /// Weighted return and standard deviation; Sharpe ratio from those
        stats: PortfolioStats,
        /// Total testing rows of the evaluated rounds
        total_days: usize,
        /// Number of evaluated rounds
        rounds: usize,
    },
    /// Every round was skipped
    NoEvaluableRounds,
}

impl Aggregate {
    /// Weight each round's return and standard deviation by its testing length.
    pub fn from_rounds<'r>(
        rounds: impl IntoIterator<Item = &'r RoundResult>,
        risk_free_rate: f64,
    ) -> Self {
        let (weighted_return, weighted_stddev, total_days, count) = rounds.into_iter().fold(
            (0.0, 0.0, 0usize, 0usize),
            |(ret, sd, days, count), r| {
                let w = r.testing_days as f64;
                (
                    ret + w * r.stats.expected_return,
                    sd + w * r.stats.stddev,
                    days + r.testing_days,
                    count + 1,
                )
            },
        );
        if total_days == 0 {
            return Self::NoEvaluableRounds;
        }
        let days = total_days as f64;
        Self::Evaluated {
            stats: PortfolioStats::new(weighted_return / days, weighted_stddev / days, risk_free_rate),
            total_days,
            rounds: count,
        }
    }
}

/// Every round's outcome and the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Round outcomes in order
    pub rounds: Vec<RoundOutcome>,
    /// Aggregate performance
    pub aggregate: Aggregate,
}

impl BacktestReport {
    /// Evaluated rounds only.
    pub fn evaluated(&self) -> impl Iterator<Item = &RoundResult> {
        self.rounds.iter().filter_map(RoundOutcome::as_evaluated)
    }

    /// Buy date of every evaluated round.
    pub fn buy_dates(&self) -> Vec<NaiveDate> {
        self.evaluated().map(|r| r.allocation.buy_date).collect()
    }

    /// Allocation bought in each evaluated round.
    pub fn allocations(&self) -> Vec<AllocationSnapshot> {
        self.evaluated().map(|r| r.allocation.clone()).collect()
    }
}

/// Walk-forward backtester.
#[derive(Debug, Clone, Default)]
pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    /// Create a backtester.
    pub const fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the backtest on `prices`, estimating training returns with `expected`.
    ///
    /// # Errors
    /// - [`BacktestError::InvalidSplit`] or [`BacktestError::InvalidParameter`]
    ///   for an unusable configuration
    /// - [`BacktestError::Round`] when estimation or optimization fails in a round
    pub fn run<E>(&self, prices: &PriceTable, expected: &E) -> Result<BacktestReport>
    where
        E: ExpectedReturns + ?Sized,
    {
        let rows = prices.len();
        let training_rows = self.config.split.training_rows(rows)?;
        let testing_rows = rows - training_rows;
        let period = match self.config.rebalancing_period {
            Some(0) => {
                return Err(BacktestError::InvalidParameter(
                    "rebalancing period must be positive".to_string(),
                ));
            }
            Some(p) => p,
            None => testing_rows,
        };
        let total_rounds = testing_rows.div_ceil(period);
        debug!(training_rows, testing_rows, period, total_rounds, "Starting backtest");

        let rounds = (0..total_rounds)
            .map(|round| {
                let end = training_rows + period * round;
                let start = if self.config.slicing { period * round } else { 0 };
                let training = prices.slice_rows(start..end);
                let testing = prices.slice_rows(end..end + period);
                self.run_round(round, &training, &testing, expected)
                    .map_err(|e| BacktestError::Round {
                        round,
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let report = BacktestReport {
            aggregate: Aggregate::from_rounds(
                rounds.iter().filter_map(RoundOutcome::as_evaluated),
                self.config.risk_free_rate,
            ),
            rounds,
        };
        match &report.aggregate {
            Aggregate::Evaluated {
                stats,
                total_days,
                rounds,
            } => info!(
                rounds,
                total_days,
                expected_return = stats.expected_return,
                stddev = stats.stddev,
                "Backtest complete"
            ),
            Aggregate::NoEvaluableRounds => warn!(
                rounds = report.rounds.len(),
                "Backtest has no evaluable rounds"
            ),
        }
        Ok(report)
    }

    fn run_round<E>(
        &self,
        round: usize,
        training: &PriceTable,
        testing: &PriceTable,
        expected: &E,
    ) -> Result<RoundOutcome>
    where
        E: ExpectedReturns + ?Sized,
    {
        let skip = |reason: SkipReason| -> Result<RoundOutcome> {
            warn!(round, %reason, "Skipping backtest round");
            Ok(RoundOutcome::Skipped { round, reason })
        };

        let training = training.drop_incomplete_assets();
        let testing = testing.drop_incomplete_assets();
        let Some(buy_date) = training.last_date().filter(|_| !testing.is_empty()) else {
            return skip(SkipReason::EmptyWindow);
        };

        let common: Vec<&String> = training
            .assets()
            .iter()
            .filter(|a| testing.assets().contains(a))
            .collect();
        if common.len() < 2 {
            return skip(SkipReason::InsufficientAssets {
                available: common.len(),
            });
        }
        let training_returns = training.select(&common)?.returns();
        let testing_returns = testing.select(&common)?.returns();
        if training_returns.len() < 2 || testing_returns.len() < 2 {
            return skip(SkipReason::InsufficientObservations {
                training: training_returns.len(),
                testing: testing_returns.len(),
            });
        }

        let rf = self.config.risk_free_rate;
        let moments = AssetMoments::from_returns(&training_returns, &self.config.covariance)?;
        let moments = expected.apply(moments, rf)?;
        let solve = PortfolioOptimizer::new(&moments)?
            .with_solver_config(self.config.solver)
            .max_sharpe(rf)?;
        if !solve.success {
            warn!(round, message = %solve.message, "Maximum Sharpe solve did not converge");
        }

        let realised = AssetMoments::from_returns_sample(&testing_returns)?;
        let stats = realised.stats(&solve.weights, rf)?;
        debug!(
            round,
            %buy_date,
            assets = common.len(),
            expected_return = stats.expected_return,
            stddev = stats.stddev,
            "Evaluated backtest round"
        );

        Ok(RoundOutcome::Evaluated(RoundResult {
            round,
            training_days: training.len(),
            testing_days: testing.len(),
            stats,
            converged: solve.success,
            allocation: AllocationSnapshot::new(
                buy_date,
                Allocation::what_to_buy(moments.assets(), &solve.weights),
            ),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rstest::rstest;
    use tangent_risk::HistoricalMean;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    /// Deterministic, non-collinear price paths.
    fn prices(n: usize) -> PriceTable {
        let values = Array2::from_shape_fn((n, 3), |(t, j)| {
            let t = t as f64;
            let j = j as f64;
            100.0 * (1.0 + 0.001 * (j + 1.0) * t + 0.02 * (0.7 * t * (j + 1.0)).sin())
        });
        PriceTable::new(dates(n), vec!["A".into(), "B".into(), "C".into()], values).unwrap()
    }

    #[rstest]
    #[case(Split::Training(60), 60)]
    #[case(Split::Testing(30), 70)]
    #[case(Split::Testing(99), 1)]
    fn test_split_rows(#[case] split: Split, #[case] training: usize) {
        assert_eq!(split.training_rows(100).unwrap(), training);
    }

    #[rstest]
    #[case(Split::Training(0))]
    #[case(Split::Testing(0))]
    #[case(Split::Testing(100))]
    #[case(Split::Training(250))]
    fn test_invalid_split(#[case] split: Split) {
        assert!(matches!(
            split.training_rows(100),
            Err(BacktestError::InvalidSplit { rows: 100, .. })
        ));
    }

    #[test]
    fn test_round_count_and_lengths() {
        let config = BacktestConfig {
            split: Split::Testing(25),
            rebalancing_period: Some(10),
            ..Default::default()
        };
        let report = Backtester::new(config).run(&prices(100), &HistoricalMean).unwrap();
        assert_eq!(report.rounds.len(), 3);
        let lengths: Vec<usize> = report.evaluated().map(|r| r.testing_days).collect();
        assert_eq!(lengths, vec![10, 10, 5]);
        let training: Vec<usize> = report.evaluated().map(|r| r.training_days).collect();
        assert_eq!(training, vec![75, 85, 95]);
        assert_eq!(
            report.buy_dates(),
            vec![dates(100)[74], dates(100)[84], dates(100)[94]]
        );
    }

    #[test]
    fn test_slicing_keeps_training_length() {
        let config = BacktestConfig {
            split: Split::Training(50),
            rebalancing_period: Some(20),
            slicing: true,
            ..Default::default()
        };
        let report = Backtester::new(config).run(&prices(100), &HistoricalMean).unwrap();
        assert!(report.evaluated().all(|r| r.training_days == 50));
        assert_eq!(report.rounds.len(), 3);
    }

    #[test]
    fn test_aggregate_is_length_weighted() {
        let round = |round: usize, days: usize, ret: f64, sd: f64| RoundResult {
            round,
            training_days: 100,
            testing_days: days,
            stats: PortfolioStats::new(ret, sd, 0.0),
            converged: true,
            allocation: AllocationSnapshot::new(dates(1)[0], Allocation::default()),
        };
        let rounds = [round(0, 30, 0.10, 0.20), round(1, 10, -0.10, 0.40)];
        let Aggregate::Evaluated {
            stats,
            total_days,
            rounds: count,
        } = Aggregate::from_rounds(&rounds, 0.0)
        else {
            panic!("expected evaluated aggregate");
        };
        assert_eq!(total_days, 40);
        assert_eq!(count, 2);
        assert_relative_eq!(stats.expected_return, 0.05, epsilon = 1e-12);
        assert_relative_eq!(stats.stddev, 0.25, epsilon = 1e-12);
        assert_relative_eq!(stats.sharpe.unwrap(), 0.2, epsilon = 1e-12);

        assert_eq!(
            Aggregate::from_rounds(std::iter::empty(), 0.0),
            Aggregate::NoEvaluableRounds
        );
    }

    #[test]
    fn test_zero_rebalancing_period_rejected() {
        let config = BacktestConfig {
            rebalancing_period: Some(0),
            split: Split::Testing(10),
            ..Default::default()
        };
        assert!(matches!(
            Backtester::new(config).run(&prices(40), &HistoricalMean),
            Err(BacktestError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_short_testing_window_is_skipped() {
        // Last round tests on a single price row: no returns to evaluate
        let config = BacktestConfig {
            split: Split::Testing(21),
            rebalancing_period: Some(10),
            ..Default::default()
        };
        let report = Backtester::new(config).run(&prices(100), &HistoricalMean).unwrap();
        assert_eq!(report.rounds.len(), 3);
        assert!(matches!(
            report.rounds[2],
            RoundOutcome::Skipped {
                round: 2,
                reason: SkipReason::InsufficientObservations { testing: 0, .. }
            }
        ));
        assert!(matches!(
            report.aggregate,
            Aggregate::Evaluated { total_days: 20, rounds: 2, .. }
        ));
    }
}
