//! Allocation requests
//!
//! The [`Advisor`] turns a request (asset universe, risk factor, lookback and
//! risk-free rate) into a recommendation: the risk-dial portfolio, its
//! anchors, the rounded holdings to buy and optionally a benchmark's
//! performance over the same lookback.

use ndarray::array;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tangent_data::PriceTable;
use tangent_optimize::{BoundOverride, Bounds, PortfolioOptimizer, RiskDial, SolverConfig};
use tangent_output::{Allocation, AnchorExport, PerformanceSummary, PriceWindow};
use tangent_risk::{AssetMoments, CovarianceMethod, ExpectedReturns, HistoricalMean};
use tracing::{debug, info};

use crate::error::AdvisorError;

/// Result type for allocation requests.
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Estimation and solver settings shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Covariance estimator for the lookback window
    pub covariance: CovarianceMethod,
    /// Solver tolerances
    pub solver: SolverConfig,
}

/// One allocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorRequest {
    /// Asset universe
    pub assets: Vec<String>,
    /// Position on the risk dial in `[0, 1]`
    #[serde(default = "default_risk_factor")]
    pub risk_factor: f64,
    /// Years of history to estimate from
    #[serde(default = "default_lookback_years")]
    pub lookback_years: f64,
    /// Annual risk-free rate
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Column to report as a benchmark
    #[serde(default)]
    pub benchmark: Option<String>,
    /// Per-asset weight bound overrides
    #[serde(default)]
    pub bounds: BTreeMap<String, BoundOverride>,
}

const fn default_risk_factor() -> f64 {
    0.5
}

const fn default_lookback_years() -> f64 {
    5.0
}

const fn default_risk_free_rate() -> f64 {
    0.025
}

impl AdvisorRequest {
    /// Request with the default risk factor (0.5), lookback (5 years) and
    /// risk-free rate (2.5%).
    pub fn new<S: AsRef<str>>(assets: &[S]) -> Self {
        Self {
            assets: assets.iter().map(|a| a.as_ref().to_string()).collect(),
            risk_factor: default_risk_factor(),
            lookback_years: default_lookback_years(),
            risk_free_rate: default_risk_free_rate(),
            benchmark: None,
            bounds: BTreeMap::new(),
        }
    }

    /// Set the risk factor.
    pub const fn with_risk_factor(mut self, risk_factor: f64) -> Self {
        self.risk_factor = risk_factor;
        self
    }

    /// Set the lookback in years.
    pub const fn with_lookback_years(mut self, years: f64) -> Self {
        self.lookback_years = years;
        self
    }

    /// Set the risk-free rate.
    pub const fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Report `benchmark` alongside the portfolio.
    pub fn with_benchmark(mut self, benchmark: impl Into<String>) -> Self {
        self.benchmark = Some(benchmark.into());
        self
    }

    /// Override the weight bounds of one asset.
    pub fn with_bound(mut self, asset: impl Into<String>, bound: BoundOverride) -> Self {
        self.bounds.insert(asset.into(), bound);
        self
    }
}

/// Answer to an [`AdvisorRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Assets in weight order, as stored in the price table
    pub assets: Vec<String>,
    /// Complete price rows the moments were estimated from
    pub window: Option<PriceWindow>,
    /// Benchmark performance over the lookback, if requested
    pub benchmark: Option<PerformanceSummary>,
    /// Performance of the recommended portfolio
    pub portfolio: PerformanceSummary,
    /// Minimum standard deviation, maximum Sharpe and maximum return anchors
    pub anchors: Vec<AnchorExport>,
    /// Annualised target return chosen by the risk dial
    pub target_return: f64,
    /// Whether the anchor returns were increasing
    pub anchors_ordered: bool,
    /// Non-zero rounded holdings, largest first
    pub what_to_buy: Allocation,
}

impl Recommendation {
    /// Benchmark (if any) followed by the portfolio, for side-by-side display.
    pub fn summaries(&self) -> Vec<PerformanceSummary> {
        self.benchmark
            .iter()
            .chain(std::iter::once(&self.portfolio))
            .cloned()
            .collect()
    }
}

/// Answers allocation requests against a price table.
#[derive(Debug, Clone, Default)]
pub struct Advisor {
    config: AdvisorConfig,
}

impl Advisor {
    /// Create an advisor.
    pub const fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub const fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Recommend a portfolio using historical mean returns.
    pub fn recommend(&self, prices: &PriceTable, request: &AdvisorRequest) -> Result<Recommendation> {
        self.recommend_with(prices, request, &HistoricalMean)
    }

    /// Recommend a portfolio with expected returns from `expected`.
    ///
    /// Rows with a missing price for any requested asset are dropped from the
    /// lookback window before estimating.
    ///
    /// # Errors
    /// - Unknown assets, too little data or an invalid lookback
    /// - An invalid risk factor or infeasible bounds
    /// - A failed anchor or risk-dial solve
    /// - [`AdvisorError::Benchmark`] if the benchmark cannot be evaluated
    pub fn recommend_with<E>(
        &self,
        prices: &PriceTable,
        request: &AdvisorRequest,
        expected: &E,
    ) -> Result<Recommendation>
    where
        E: ExpectedReturns + ?Sized,
    {
        let rf = request.risk_free_rate;
        let window = prices.lookback_years(request.lookback_years)?;
        let universe = window.select(&request.assets)?.drop_incomplete_rows();
        debug!(
            assets = universe.assets().len(),
            rows = universe.len(),
            "Estimating moments for allocation request"
        );

        let moments = AssetMoments::from_returns(&universe.returns(), &self.config.covariance)?;
        let moments = expected.apply(moments, rf)?;
        let bounds = Bounds::with_overrides(moments.assets(), &request.bounds)?;
        let optimizer = PortfolioOptimizer::new(&moments)?
            .with_solver_config(self.config.solver)
            .with_bounds(bounds)?;
        let dial = RiskDial::resolve(&optimizer, request.risk_factor, rf)?;

        let benchmark = request
            .benchmark
            .as_deref()
            .map(|b| benchmark_summary(&window, b, rf))
            .transpose()?;

        let portfolio = PerformanceSummary::new("Portfolio", dial.stats);
        info!(
            risk_factor = request.risk_factor,
            target_return = dial.target_return,
            expected_return = portfolio.expected_return,
            stddev = portfolio.stddev,
            "Allocation request resolved"
        );

        Ok(Recommendation {
            assets: moments.assets().to_vec(),
            window: PriceWindow::from_dates(universe.dates()),
            benchmark,
            anchors: AnchorExport::from_anchors(moments.assets(), &dial.anchors),
            target_return: dial.target_return,
            anchors_ordered: dial.anchors_ordered,
            what_to_buy: Allocation::what_to_buy(moments.assets(), &dial.allocation.weights),
            portfolio,
        })
    }
}

/// Benchmark as a single-asset portfolio over its own complete history in `window`.
fn benchmark_summary(window: &PriceTable, benchmark: &str, rf: f64) -> Result<PerformanceSummary> {
    let fail = |reason: String| AdvisorError::Benchmark {
        asset: benchmark.to_string(),
        reason,
    };
    let column = window
        .select(&[benchmark])
        .map_err(|e| fail(e.to_string()))?
        .drop_incomplete_rows();
    let stats = AssetMoments::from_returns_sample(&column.returns())
        .and_then(|m| m.stats(&array![1.0], rf))
        .map_err(|e| fail(e.to_string()))?;
    Ok(PerformanceSummary::new(benchmark, stats))
}
