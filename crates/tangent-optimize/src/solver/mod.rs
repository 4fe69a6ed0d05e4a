//! Constrained nonlinear minimization over the capped simplex
//!
//! Solves
//!
//! ```text
//! minimize    f(x)
//! subject to  h_i(x) = 0      (equalities)
//!             l <= x <= u,  Σ x = 1
//! ```
//!
//! The box and budget constraints are handled exactly by projection
//! ([`projection::project_capped_simplex`]). Extra constraints go through an
//! augmented Lagrangian whose subproblems are solved by a nonmonotone
//! spectral projected gradient method ([`spg`]).

pub mod lagrangian;
pub mod projection;
pub mod spg;

pub use lagrangian::AugmentedLagrangian;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{bounds::Bounds, error::Result};

/// Relative step used by the default finite-difference gradients.
const FD_STEP: f64 = 1e-7;

/// Central finite-difference gradient of `f` at `x`.
pub fn finite_difference_gradient(f: impl Fn(&Array1<f64>) -> f64, x: &Array1<f64>) -> Array1<f64> {
    let mut probe = x.clone();
    Array1::from_shape_fn(x.len(), |i| {
        let h = FD_STEP * x[i].abs().max(1.0);
        let xi = probe[i];
        probe[i] = xi + h;
        let forward = f(&probe);
        probe[i] = xi - h;
        let backward = f(&probe);
        probe[i] = xi;
        (forward - backward) / (2.0 * h)
    })
}

/// A smooth function to minimize.
pub trait Objective {
    /// Function value at `x`
    fn value(&self, x: &Array1<f64>) -> f64;

    /// Gradient at `x`
    ///
    /// Defaults to central finite differences.
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        finite_difference_gradient(|y| self.value(y), x)
    }
}

/// A smooth equality constraint `h(x) = 0`.
pub trait Constraint {
    /// Constraint value at `x`
    fn value(&self, x: &Array1<f64>) -> f64;

    /// Gradient at `x`
    ///
    /// Defaults to central finite differences.
    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        finite_difference_gradient(|y| self.value(y), x)
    }
}

/// An objective with constraints over a capped simplex.
pub struct Problem<'a> {
    objective: &'a dyn Objective,
    equalities: Vec<&'a dyn Constraint>,
    bounds: &'a Bounds,
}

impl std::fmt::Debug for Problem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Problem")
            .field("equalities", &self.equalities.len())
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl<'a> Problem<'a> {
    /// Minimize `objective` over the bounds and the budget constraint.
    pub fn new(objective: &'a dyn Objective, bounds: &'a Bounds) -> Self {
        Self {
            objective,
            equalities: Vec::new(),
            bounds,
        }
    }

    /// Add an equality constraint `h(x) = 0`.
    pub fn equality(mut self, constraint: &'a dyn Constraint) -> Self {
        self.equalities.push(constraint);
        self
    }

    /// Objective function.
    pub fn objective(&self) -> &'a dyn Objective {
        self.objective
    }

    /// Box bounds (the budget constraint is implicit).
    pub const fn bounds(&self) -> &'a Bounds {
        self.bounds
    }

    /// Whether the problem has constraints beyond bounds and budget.
    pub fn has_constraints(&self) -> bool {
        !self.equalities.is_empty()
    }

    /// Largest violation of the extra constraints at `x`.
    pub fn max_violation(&self, x: &Array1<f64>) -> f64 {
        self.equalities
            .iter()
            .map(|h| h.value(x).abs())
            .fold(0.0, f64::max)
    }
}

/// Solver tolerances and iteration limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum projected-gradient iterations per subproblem (default: 5000)
    pub max_iterations: usize,

    /// Maximum augmented Lagrangian outer iterations (default: 50)
    pub max_outer_iterations: usize,

    /// Stop when the projected gradient infinity norm is below this (default: 1e-9)
    pub tolerance: f64,

    /// Largest accepted constraint violation (default: 1e-8)
    pub feasibility_tolerance: f64,

    /// Initial penalty parameter ρ (default: 10)
    pub initial_penalty: f64,

    /// Factor applied to ρ when the violation does not shrink enough (default: 10)
    pub penalty_growth: f64,

    /// Upper limit on ρ (default: 1e8)
    pub max_penalty: f64,

    /// Number of past values in the nonmonotone line search (default: 10)
    pub memory: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            max_outer_iterations: 50,
            tolerance: 1e-9,
            feasibility_tolerance: 1e-8,
            initial_penalty: 10.0,
            penalty_growth: 10.0,
            max_penalty: 1e8,
            memory: 10,
        }
    }
}

/// Outcome of a solve
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Final point (always inside bounds and summing to one)
    pub x: Array1<f64>,
    /// Objective value f(x), without penalty terms
    pub value: f64,
    /// Whether optimality and feasibility tolerances were met
    pub success: bool,
    /// Total projected-gradient iterations
    pub iterations: usize,
    /// Largest violation of the extra constraints
    pub max_violation: f64,
    /// Human-readable status
    pub message: String,
}

/// A constrained minimizer
pub trait Solver {
    /// Minimize `problem` starting from `initial`.
    ///
    /// `initial` is projected onto the feasible box and budget set first.
    /// Non-convergence is reported through [`Solution::success`]; an error is
    /// returned only for malformed input.
    fn minimize(&self, problem: &Problem<'_>, initial: &Array1<f64>) -> Result<Solution>;
}
