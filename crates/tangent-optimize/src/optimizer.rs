//! The five canonical portfolio problems
//!
//! Every problem is fully invested (Σ w = 1) within per-asset [`Bounds`] and
//! starts from the uniform portfolio:
//!
//! - **Minimum standard deviation**: minimize s(w)
//! - **Maximum Sharpe**: minimize -(R(w) - r_f) / s(w)
//! - **Maximum return**: minimize -R(w)
//! - **Efficient return**: minimize s(w) subject to R(w) = target
//! - **Maximum utility**: minimize -(R(w) - λ/2 · s(w))

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tangent_risk::AssetMoments;
use tracing::{debug, warn};

use crate::{
    bounds::Bounds,
    error::{OptimizeError, Result},
    objective::{PortfolioObjective, TargetReturn},
    solver::{AugmentedLagrangian, Problem, Solver, SolverConfig},
};

/// Relative slack for targets at the edge of the achievable return range.
const RANGE_TOLERANCE: f64 = 1e-10;

/// Allowed drift of the solution from the budget and the bounds.
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// A canonical portfolio problem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum PortfolioProblem {
    /// Lowest-volatility portfolio
    MinimizeStdDev,
    /// Tangency portfolio
    MaximizeSharpe {
        /// Annual risk-free rate
        risk_free_rate: f64,
    },
    /// Highest-return portfolio
    MaximizeReturn,
    /// Lowest-volatility portfolio with a given annual return
    EfficientReturn {
        /// Annual target return
        target: f64,
    },
    /// Highest risk-aversion utility
    MaximizeUtility {
        /// Risk aversion λ >= 0
        risk_aversion: f64,
    },
}

impl fmt::Display for PortfolioProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinimizeStdDev => write!(f, "minimum standard deviation"),
            Self::MaximizeSharpe { risk_free_rate } => {
                write!(f, "maximum Sharpe ratio (risk-free rate {risk_free_rate})")
            }
            Self::MaximizeReturn => write!(f, "maximum return"),
            Self::EfficientReturn { target } => write!(f, "efficient return (target {target})"),
            Self::MaximizeUtility { risk_aversion } => {
                write!(f, "maximum utility (risk aversion {risk_aversion})")
            }
        }
    }
}

/// Outcome of one portfolio solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Problem that was solved
    pub problem: PortfolioProblem,
    /// Portfolio weights in asset order
    pub weights: Array1<f64>,
    /// Achieved value of the minimized objective (negated for maximizations)
    pub objective: f64,
    /// Whether the solver met its tolerances
    pub success: bool,
    /// Total solver iterations
    pub iterations: usize,
    /// Solver status message
    pub message: String,
    /// Largest violation of the target-return constraint, if any
    pub constraint_violation: f64,
}

impl OptimizationResult {
    /// The result itself, or [`OptimizeError::SolverFailed`] when unsuccessful.
    pub fn into_checked(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(OptimizeError::SolverFailed(Box::new(self)))
        }
    }
}

/// Solves portfolio problems over one set of asset moments.
#[derive(Debug, Clone)]
pub struct PortfolioOptimizer<'a, S = AugmentedLagrangian> {
    moments: &'a AssetMoments,
    bounds: Bounds,
    solver: S,
}

impl<'a> PortfolioOptimizer<'a> {
    /// Optimizer with default `[0, 1]` bounds and solver settings.
    pub fn new(moments: &'a AssetMoments) -> Result<Self> {
        if moments.is_empty() {
            return Err(OptimizeError::EmptyUniverse);
        }
        Ok(Self {
            moments,
            bounds: Bounds::unit(moments.len()),
            solver: AugmentedLagrangian::default(),
        })
    }

    /// Replace the solver tolerances.
    pub fn with_solver_config(self, config: SolverConfig) -> Self {
        Self {
            solver: AugmentedLagrangian::new(config),
            ..self
        }
    }
}

impl<'a, S: Solver> PortfolioOptimizer<'a, S> {
    /// Replace the weight bounds.
    pub fn with_bounds(self, bounds: Bounds) -> Result<Self> {
        if bounds.len() != self.moments.len() {
            return Err(OptimizeError::DimensionMismatch {
                expected: self.moments.len(),
                actual: bounds.len(),
            });
        }
        Ok(Self { bounds, ..self })
    }

    /// Use a different solver.
    pub fn with_solver<T: Solver>(self, solver: T) -> PortfolioOptimizer<'a, T> {
        PortfolioOptimizer {
            moments: self.moments,
            bounds: self.bounds,
            solver,
        }
    }

    /// Moments the optimizer works on.
    pub const fn moments(&self) -> &'a AssetMoments {
        self.moments
    }

    /// Weight bounds.
    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Achievable annual return interval under the bounds.
    pub fn return_range(&self) -> Result<(f64, f64)> {
        self.bounds
            .return_range(self.moments.mean(), self.moments.periods_per_year())
    }

    /// Solve `problem`.
    ///
    /// Parameters are validated first. A solver that misses its tolerances,
    /// or returns weights off the budget or outside the bounds, still returns
    /// `Ok` with `success = false`; use
    /// [`OptimizationResult::into_checked`] to turn that into an error.
    ///
    /// # Errors
    /// - [`OptimizeError::TargetOutOfRange`] for an unreachable target return
    /// - [`OptimizeError::InvalidParameter`] for a non-finite risk-free rate or
    ///   a negative risk aversion
    pub fn solve(&self, problem: PortfolioProblem) -> Result<OptimizationResult> {
        let problem = self.validate(problem)?;
        let objective = PortfolioObjective::new(self.moments, problem);
        let initial = self.bounds.initial_point();

        let solution = match problem {
            PortfolioProblem::EfficientReturn { target } => {
                let constraint = TargetReturn::new(self.moments, target);
                let constrained = Problem::new(&objective, &self.bounds).equality(&constraint);
                self.solver.minimize(&constrained, &initial)?
            }
            _ => self
                .solver
                .minimize(&Problem::new(&objective, &self.bounds), &initial)?,
        };

        let feasible = self.bounds.contains(&solution.x, FEASIBILITY_TOLERANCE);
        let success = solution.success && feasible;
        let message = if feasible {
            solution.message
        } else {
            format!(
                "Weights sum to {:.12} or leave the bounds",
                solution.x.sum()
            )
        };

        debug!(
            %problem,
            iterations = solution.iterations,
            objective = solution.value,
            violation = solution.max_violation,
            success,
            "Solved portfolio problem"
        );
        if !success {
            warn!(%problem, %message, "Portfolio solve did not converge");
        }

        Ok(OptimizationResult {
            problem,
            weights: solution.x,
            objective: solution.value,
            success,
            iterations: solution.iterations,
            message,
            constraint_violation: solution.max_violation,
        })
    }

    /// Minimum standard deviation portfolio.
    pub fn min_stddev(&self) -> Result<OptimizationResult> {
        self.solve(PortfolioProblem::MinimizeStdDev)
    }

    /// Maximum Sharpe ratio portfolio.
    pub fn max_sharpe(&self, risk_free_rate: f64) -> Result<OptimizationResult> {
        self.solve(PortfolioProblem::MaximizeSharpe { risk_free_rate })
    }

    /// Maximum return portfolio.
    pub fn max_return(&self) -> Result<OptimizationResult> {
        self.solve(PortfolioProblem::MaximizeReturn)
    }

    /// Minimum standard deviation portfolio with annual return `target`.
    pub fn efficient_return(&self, target: f64) -> Result<OptimizationResult> {
        self.solve(PortfolioProblem::EfficientReturn { target })
    }

    /// Maximum utility portfolio for risk aversion `risk_aversion`.
    pub fn max_utility(&self, risk_aversion: f64) -> Result<OptimizationResult> {
        self.solve(PortfolioProblem::MaximizeUtility { risk_aversion })
    }

    fn validate(&self, problem: PortfolioProblem) -> Result<PortfolioProblem> {
        match problem {
            PortfolioProblem::MaximizeSharpe { risk_free_rate } if !risk_free_rate.is_finite() => {
                Err(OptimizeError::InvalidParameter(format!(
                    "risk-free rate must be finite, got {risk_free_rate}"
                )))
            }
            PortfolioProblem::MaximizeUtility { risk_aversion }
                if !(risk_aversion.is_finite() && risk_aversion >= 0.0) =>
            {
                Err(OptimizeError::InvalidParameter(format!(
                    "risk aversion must be finite and non-negative, got {risk_aversion}"
                )))
            }
            PortfolioProblem::EfficientReturn { target } => {
                let (min, max) = self.return_range()?;
                let slack = RANGE_TOLERANCE * min.abs().max(max.abs()).max(1.0);
                if !target.is_finite() || target < min - slack || target > max + slack {
                    return Err(OptimizeError::TargetOutOfRange { target, min, max });
                }
                Ok(PortfolioProblem::EfficientReturn {
                    target: target.clamp(min, max),
                })
            }
            other => Ok(other),
        }
    }
}
