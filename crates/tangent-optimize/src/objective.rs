//! Portfolio objectives and the target-return constraint
//!
//! Gradients are analytic. With `R = A μᵀw` and `s = √(A wᵀΣw)`:
//!
//! ```text
//! ∇R = A μ
//! ∇s = A Σw / s
//! ∇(-(R - r_f)/s) = -(s ∇R - (R - r_f) ∇s) / s²
//! ∇(-(R - λ/2 s)) = -(∇R - λ/2 ∇s)
//! ```
//!
//! `s` is floored at [`MIN_VOLATILITY`] inside the objectives so that a
//! zero-variance portfolio keeps a finite value and gradient.

use ndarray::Array1;
use tangent_risk::{
    AssetMoments,
    metrics::{self, MIN_VOLATILITY},
};

use crate::{
    optimizer::PortfolioProblem,
    solver::{Constraint, Objective},
};

/// One of the canonical portfolio problems written as a minimization.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioObjective<'a> {
    moments: &'a AssetMoments,
    problem: PortfolioProblem,
}

impl<'a> PortfolioObjective<'a> {
    /// Objective for `problem` over the assets of `moments`.
    pub const fn new(moments: &'a AssetMoments, problem: PortfolioProblem) -> Self {
        Self { moments, problem }
    }

    fn annual_return(&self, w: &Array1<f64>) -> f64 {
        metrics::portfolio_return(w, self.moments.mean(), self.moments.periods_per_year())
    }

    fn return_gradient(&self) -> Array1<f64> {
        self.moments.mean() * self.moments.periods_per_year()
    }

    fn stddev(&self, w: &Array1<f64>) -> f64 {
        metrics::portfolio_stddev(w, self.moments.covariance(), self.moments.periods_per_year())
            .max(MIN_VOLATILITY)
    }

    fn stddev_gradient(&self, w: &Array1<f64>, stddev: f64) -> Array1<f64> {
        self.moments.covariance().dot(w) * (self.moments.periods_per_year() / stddev)
    }
}

impl Objective for PortfolioObjective<'_> {
    fn value(&self, w: &Array1<f64>) -> f64 {
        match self.problem {
            PortfolioProblem::MinimizeStdDev | PortfolioProblem::EfficientReturn { .. } => {
                self.stddev(w)
            }
            PortfolioProblem::MaximizeSharpe { risk_free_rate } => {
                -(self.annual_return(w) - risk_free_rate) / self.stddev(w)
            }
            PortfolioProblem::MaximizeReturn => -self.annual_return(w),
            PortfolioProblem::MaximizeUtility { risk_aversion } => {
                -(self.annual_return(w) - risk_aversion / 2.0 * self.stddev(w))
            }
        }
    }

    fn gradient(&self, w: &Array1<f64>) -> Array1<f64> {
        match self.problem {
            PortfolioProblem::MinimizeStdDev | PortfolioProblem::EfficientReturn { .. } => {
                let s = self.stddev(w);
                self.stddev_gradient(w, s)
            }
            PortfolioProblem::MaximizeSharpe { risk_free_rate } => {
                let s = self.stddev(w);
                let excess = self.annual_return(w) - risk_free_rate;
                let numerator = self.return_gradient() * s - self.stddev_gradient(w, s) * excess;
                numerator * (-1.0 / (s * s))
            }
            PortfolioProblem::MaximizeReturn => -self.return_gradient(),
            PortfolioProblem::MaximizeUtility { risk_aversion } => {
                let s = self.stddev(w);
                self.stddev_gradient(w, s) * (risk_aversion / 2.0) - self.return_gradient()
            }
        }
    }
}

/// Equality constraint `A μᵀw - target = 0`.
#[derive(Debug, Clone, Copy)]
pub struct TargetReturn<'a> {
    moments: &'a AssetMoments,
    target: f64,
}

impl<'a> TargetReturn<'a> {
    /// Constraint pinning the annualised return to `target`.
    pub const fn new(moments: &'a AssetMoments, target: f64) -> Self {
        Self { moments, target }
    }
}

impl Constraint for TargetReturn<'_> {
    fn value(&self, w: &Array1<f64>) -> f64 {
        metrics::portfolio_return(w, self.moments.mean(), self.moments.periods_per_year())
            - self.target
    }

    fn gradient(&self, _w: &Array1<f64>) -> Array1<f64> {
        self.moments.mean() * self.moments.periods_per_year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::finite_difference_gradient;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::rstest;

    fn moments() -> AssetMoments {
        AssetMoments::new(
            vec!["A".into(), "B".into(), "C".into()],
            array![0.0008, 0.0012, 0.0004],
            array![
                [0.0004, 0.0001, 0.00005],
                [0.0001, 0.0009, 0.0002],
                [0.00005, 0.0002, 0.0003]
            ],
        )
        .unwrap()
    }

    #[rstest]
    #[case::min_stddev(PortfolioProblem::MinimizeStdDev)]
    #[case::max_sharpe(PortfolioProblem::MaximizeSharpe { risk_free_rate: 0.02 })]
    #[case::max_return(PortfolioProblem::MaximizeReturn)]
    #[case::efficient(PortfolioProblem::EfficientReturn { target: 0.2 })]
    #[case::utility(PortfolioProblem::MaximizeUtility { risk_aversion: 3.0 })]
    fn test_gradient_matches_finite_difference(#[case] problem: PortfolioProblem) {
        let m = moments();
        let objective = PortfolioObjective::new(&m, problem);
        let w = array![0.5, 0.2, 0.3];
        let analytic = objective.gradient(&w);
        let numeric = finite_difference_gradient(|x| objective.value(x), &w);
        for i in 0..3 {
            assert_abs_diff_eq!(analytic[i], numeric[i], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_objective_signs() {
        let m = moments();
        let w = array![0.5, 0.2, 0.3];
        let ret = m.portfolio_return(&w).unwrap();
        let sd = m.portfolio_stddev(&w).unwrap();

        let value = |p| PortfolioObjective::new(&m, p).value(&w);
        assert_abs_diff_eq!(value(PortfolioProblem::MinimizeStdDev), sd, epsilon = 1e-15);
        assert_abs_diff_eq!(value(PortfolioProblem::MaximizeReturn), -ret, epsilon = 1e-15);
        assert_abs_diff_eq!(
            value(PortfolioProblem::MaximizeSharpe { risk_free_rate: 0.01 }),
            -(ret - 0.01) / sd,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            value(PortfolioProblem::MaximizeUtility { risk_aversion: 2.0 }),
            -(ret - sd),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_target_return_constraint() {
        let m = moments();
        let c = TargetReturn::new(&m, 0.2016);
        // 252 * 0.0008 = 0.2016
        assert_abs_diff_eq!(c.value(&array![1.0, 0.0, 0.0]), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(c.gradient(&array![1.0, 0.0, 0.0])[1], 252.0 * 0.0012, epsilon = 1e-15);
    }
}
