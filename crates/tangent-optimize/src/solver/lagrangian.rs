//! Augmented Lagrangian outer loop
//!
//! For equalities `h_i(x) = 0` the subproblem objective is
//!
//! ```text
//! L(x) = f(x) + Σ_i (λ_i h_i + ρ/2 h_i²)
//! ```
//!
//! minimized over the capped simplex by [`spg`](super::spg). After each
//! subproblem `λ_i += ρ h_i`, and ρ grows when the violation did not fall
//! below a quarter of its previous value.

use ndarray::Array1;
use tracing::trace;

use super::{Objective, Problem, Solution, Solver, SolverConfig, spg};
use crate::error::{OptimizeError, Result};

/// Required shrink factor of the violation between outer iterations.
const VIOLATION_DECREASE: f64 = 0.25;

/// Augmented Lagrangian solver over the capped simplex.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentedLagrangian {
    config: SolverConfig,
}

impl AugmentedLagrangian {
    /// Create a solver with the given configuration.
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solver configuration.
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }
}

struct AugmentedObjective<'p, 'a> {
    problem: &'p Problem<'a>,
    lambda: &'p [f64],
    rho: f64,
}

impl Objective for AugmentedObjective<'_, '_> {
    fn value(&self, x: &Array1<f64>) -> f64 {
        let mut total = self.problem.objective.value(x);
        for (h, &l) in self.problem.equalities.iter().zip(self.lambda) {
            let hx = h.value(x);
            total += l * hx + 0.5 * self.rho * hx * hx;
        }
        total
    }

    fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut grad = self.problem.objective.gradient(x);
        for (h, &l) in self.problem.equalities.iter().zip(self.lambda) {
            grad.scaled_add(l + self.rho * h.value(x), &h.gradient(x));
        }
        grad
    }
}

fn message(stationary: bool, violation: f64, feasibility_tolerance: f64) -> String {
    match (stationary, violation <= feasibility_tolerance) {
        (true, true) => "Optimization terminated successfully".to_string(),
        (true, false) => format!(
            "Constraint violation {violation:.3e} exceeds tolerance {feasibility_tolerance:.1e}"
        ),
        (false, _) => "Projected gradient did not converge".to_string(),
    }
}

impl Solver for AugmentedLagrangian {
    fn minimize(&self, problem: &Problem<'_>, initial: &Array1<f64>) -> Result<Solution> {
        let bounds = problem.bounds();
        if initial.len() != bounds.len() {
            return Err(OptimizeError::DimensionMismatch {
                expected: bounds.len(),
                actual: initial.len(),
            });
        }
        let config = &self.config;

        if !problem.has_constraints() {
            let run = spg::minimize(problem.objective(), bounds, initial, config);
            let stationary = run.is_stationary(config.tolerance);
            return Ok(Solution {
                value: run.value,
                success: stationary,
                iterations: run.iterations,
                max_violation: 0.0,
                message: message(stationary, 0.0, config.feasibility_tolerance),
                x: run.x,
            });
        }

        let mut lambda = vec![0.0; problem.equalities.len()];
        let mut rho = config.initial_penalty;
        let mut x = bounds.project(initial);
        let mut previous_violation = problem.max_violation(&x);
        let mut violation = previous_violation;
        let mut stationary = false;
        let mut iterations = 0;

        for outer in 0..config.max_outer_iterations {
            let run = {
                let augmented = AugmentedObjective {
                    problem,
                    lambda: &lambda,
                    rho,
                };
                spg::minimize(&augmented, bounds, &x, config)
            };
            iterations += run.iterations;
            stationary = run.is_stationary(config.tolerance);
            x = run.x;
            violation = problem.max_violation(&x);
            trace!(outer, rho, violation, status = ?run.status, "Augmented Lagrangian step");

            if stationary && violation <= config.feasibility_tolerance {
                break;
            }

            for (l, h) in lambda.iter_mut().zip(&problem.equalities) {
                *l += rho * h.value(&x);
            }
            if violation > VIOLATION_DECREASE * previous_violation {
                rho = (rho * config.penalty_growth).min(config.max_penalty);
            }
            previous_violation = violation;
        }

        let success = stationary && violation <= config.feasibility_tolerance;
        Ok(Solution {
            value: problem.objective().value(&x),
            success,
            iterations,
            max_violation: violation,
            message: message(stationary, violation, config.feasibility_tolerance),
            x,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bounds::Bounds, solver::Constraint};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    struct SumOfSquares;

    impl Objective for SumOfSquares {
        fn value(&self, x: &Array1<f64>) -> f64 {
            x.dot(x)
        }

        fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
            x * 2.0
        }
    }

    /// `x_0 - x_1 - gap`
    struct Spread(f64);

    impl Constraint for Spread {
        fn value(&self, x: &Array1<f64>) -> f64 {
            x[0] - x[1] - self.0
        }
    }

    #[test]
    fn test_unconstrained_is_single_spg_run() {
        let bounds = Bounds::unit(3);
        let problem = Problem::new(&SumOfSquares, &bounds);
        let solution = AugmentedLagrangian::default()
            .minimize(&problem, &array![1.0, 0.0, 0.0])
            .unwrap();
        assert!(solution.success);
        assert_eq!(solution.max_violation, 0.0);
        for v in solution.x.iter() {
            assert_abs_diff_eq!(*v, 1.0 / 3.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_equality_constraint() {
        let bounds = Bounds::unit(3);
        let spread = Spread(0.2);
        let problem = Problem::new(&SumOfSquares, &bounds).equality(&spread);
        let solution = AugmentedLagrangian::default()
            .minimize(&problem, &bounds.initial_point())
            .unwrap();
        assert!(solution.success, "{}", solution.message);
        assert_abs_diff_eq!(solution.x[0], 0.8 / 3.0 + 0.5 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.x[1], 0.7 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.x[2], 1.0 / 3.0, epsilon = 1e-6);
        assert!(solution.max_violation <= 1e-8);
    }

    #[test]
    fn test_dimension_mismatch() {
        let bounds = Bounds::unit(3);
        let problem = Problem::new(&SumOfSquares, &bounds);
        assert!(matches!(
            AugmentedLagrangian::default().minimize(&problem, &array![0.5, 0.5]),
            Err(OptimizeError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }
}
