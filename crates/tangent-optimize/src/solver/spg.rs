//! Nonmonotone spectral projected gradient (SPG2)
//!
//! Birgin, Martínez and Raydan (2000). Each iteration moves along
//! `d = P(x - α g) - x` with the Barzilai-Borwein step α = sᵀs / sᵀy and
//! accepts the step by a nonmonotone Armijo rule against the largest of the
//! last `memory` objective values, backtracking with safeguarded quadratic
//! interpolation.
//!
//! Steps are capped at `STEP_SCALE / ‖g‖∞` so that `x - α g` stays within a
//! few orders of magnitude of the weights. Past that the projection cannot
//! resolve interior coordinates, and a linear objective (where sᵀy = 0)
//! would otherwise request the largest admissible step on every iteration.

use std::collections::VecDeque;

use ndarray::Array1;

use super::{Objective, SolverConfig};
use crate::bounds::Bounds;

const ALPHA_MIN: f64 = 1e-12;
const ALPHA_MAX: f64 = 1e12;
const STEP_SCALE: f64 = 1e4;
const ARMIJO: f64 = 1e-4;
const SIGMA_LOW: f64 = 0.1;
const SIGMA_HIGH: f64 = 0.9;
const MIN_STEP: f64 = 1e-16;

/// How a projected-gradient run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpgStatus {
    /// Projected gradient below tolerance
    Converged,
    /// Line search could not make progress
    Stalled,
    /// Iteration limit reached
    MaxIterations,
}

/// Result of a projected-gradient run
#[derive(Debug, Clone)]
pub struct SpgResult {
    /// Final feasible point
    pub x: Array1<f64>,
    /// Objective value at `x`
    pub value: f64,
    /// Infinity norm of `P(x - g) - x` at `x`
    pub projected_gradient: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Termination reason
    pub status: SpgStatus,
}

impl SpgResult {
    /// Whether the run reached a usable stationary point.
    ///
    /// A stalled line search counts when the projected gradient is within
    /// the square root of the tolerance, which is where rounding in the
    /// objective stops the Armijo test from accepting further steps.
    pub fn is_stationary(&self, tolerance: f64) -> bool {
        match self.status {
            SpgStatus::Converged => true,
            SpgStatus::Stalled | SpgStatus::MaxIterations => {
                self.projected_gradient <= tolerance.sqrt()
            }
        }
    }
}

/// Largest step allowed for gradient `g`.
fn step_cap(g: &Array1<f64>) -> f64 {
    let scale = g.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale > 0.0 {
        (STEP_SCALE / scale).clamp(ALPHA_MIN, ALPHA_MAX)
    } else {
        ALPHA_MAX
    }
}

fn projected_gradient_norm(bounds: &Bounds, x: &Array1<f64>, g: &Array1<f64>) -> f64 {
    let trial = bounds.project(&(x - g));
    (&trial - x).iter().fold(0.0, |m, v| m.max(v.abs()))
}

/// Minimize `objective` over the capped simplex defined by `bounds`.
pub fn minimize(
    objective: &dyn Objective,
    bounds: &Bounds,
    initial: &Array1<f64>,
    config: &SolverConfig,
) -> SpgResult {
    let mut x = bounds.project(initial);
    let mut f = objective.value(&x);
    let mut g = objective.gradient(&x);
    let mut history: VecDeque<f64> = VecDeque::with_capacity(config.memory.max(1));
    history.push_back(f);

    let mut pg = projected_gradient_norm(bounds, &x, &g);
    let mut alpha = if pg > 0.0 {
        (1.0 / pg).clamp(ALPHA_MIN, step_cap(&g))
    } else {
        1.0
    };

    let mut iterations = 0;
    let status = loop {
        if pg <= config.tolerance {
            break SpgStatus::Converged;
        }
        if iterations >= config.max_iterations {
            break SpgStatus::MaxIterations;
        }
        iterations += 1;

        let d = bounds.project(&(&x - &(&g * alpha))) - &x;
        let gtd = g.dot(&d);
        let f_max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut lambda = 1.0;
        let accepted = loop {
            let candidate = &x + &(&d * lambda);
            let f_new = objective.value(&candidate);
            if f_new.is_finite() && f_new <= f_max + ARMIJO * lambda * gtd {
                break Some((candidate, f_new));
            }
            let denom = f_new - f - lambda * gtd;
            let trial = if f_new.is_finite() && denom > 0.0 {
                -0.5 * lambda * lambda * gtd / denom
            } else {
                lambda / 2.0
            };
            lambda = if trial >= SIGMA_LOW * lambda && trial <= SIGMA_HIGH * lambda {
                trial
            } else {
                lambda / 2.0
            };
            if lambda < MIN_STEP {
                break None;
            }
        };

        let Some((candidate, f_candidate)) = accepted else {
            break SpgStatus::Stalled;
        };
        // x + λd is feasible only up to rounding; keep iterates on the set
        let x_new = bounds.project(&candidate);
        let f_new = if x_new == candidate {
            f_candidate
        } else {
            objective.value(&x_new)
        };

        let g_new = objective.gradient(&x_new);
        let s = &x_new - &x;
        let y = &g_new - &g;
        let sty = s.dot(&y);
        let cap = step_cap(&g_new);
        alpha = if sty <= 0.0 {
            cap
        } else {
            (s.dot(&s) / sty).clamp(ALPHA_MIN, cap)
        };

        x = x_new;
        f = f_new;
        g = g_new;
        pg = projected_gradient_norm(bounds, &x, &g);

        if history.len() == config.memory.max(1) {
            history.pop_front();
        }
        history.push_back(f);
    };

    SpgResult {
        x,
        value: f,
        projected_gradient: pg,
        iterations,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// ‖x - c‖²
    struct Distance(Array1<f64>);

    impl Objective for Distance {
        fn value(&self, x: &Array1<f64>) -> f64 {
            (x - &self.0).mapv(|v| v * v).sum()
        }

        fn gradient(&self, x: &Array1<f64>) -> Array1<f64> {
            (x - &self.0) * 2.0
        }
    }

    /// Linear objective cᵀx with finite-difference gradient
    struct Linear(Array1<f64>);

    impl Objective for Linear {
        fn value(&self, x: &Array1<f64>) -> f64 {
            self.0.dot(x)
        }
    }

    #[test]
    fn test_minimizer_is_projection() {
        let bounds = Bounds::unit(3);
        let target = array![0.9, 0.6, -0.3];
        let result = minimize(
            &Distance(target.clone()),
            &bounds,
            &array![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            &SolverConfig::default(),
        );
        let expected = bounds.project(&target);
        assert!(result.is_stationary(1e-9));
        for i in 0..3 {
            assert_abs_diff_eq!(result.x[i], expected[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_linear_objective_reaches_vertex() {
        let bounds = Bounds::unit(4);
        let result = minimize(
            &Linear(array![0.3, -0.2, 0.1, -0.5]),
            &bounds,
            &Array1::from_elem(4, 0.25),
            &SolverConfig::default(),
        );
        assert_eq!(result.status, SpgStatus::Converged);
        assert_abs_diff_eq!(result.x[3], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.value, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_objective_with_caps_stays_on_simplex() {
        let bounds = Bounds::new(array![0.05, 0.0, 0.0, 0.0], array![1.0, 0.4, 1.0, 0.5]).unwrap();
        let result = minimize(
            &Linear(array![-0.1, -0.3, -0.2, 0.05]),
            &bounds,
            &bounds.initial_point(),
            &SolverConfig::default(),
        );
        assert!(result.is_stationary(1e-9));
        assert!(bounds.contains(&result.x, 1e-12));
        assert_abs_diff_eq!(result.x[0], 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(result.x[1], 0.4, epsilon = 1e-9);
        assert_abs_diff_eq!(result.x[2], 0.55, epsilon = 1e-9);
        assert_abs_diff_eq!(result.x[3], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_step_cap_scales_with_gradient() {
        assert_eq!(step_cap(&Array1::zeros(3)), ALPHA_MAX);
        assert_abs_diff_eq!(step_cap(&array![0.5, -2.0]), STEP_SCALE / 2.0);
        assert_eq!(step_cap(&array![1e-20]), ALPHA_MAX);
    }

    #[test]
    fn test_iteration_limit() {
        let config = SolverConfig {
            max_iterations: 0,
            ..Default::default()
        };
        let result = minimize(
            &Distance(array![1.0, 0.0]),
            &Bounds::unit(2),
            &array![0.5, 0.5],
            &config,
        );
        assert_eq!(result.status, SpgStatus::MaxIterations);
        assert_eq!(result.iterations, 0);
        assert!(!result.is_stationary(1e-9));
    }
}
