//! Euclidean projection onto the capped simplex
//!
//! The feasible set of every portfolio problem is
//! `{ w : l ≤ w ≤ u, Σ w = 1 }`. Its projection has the form
//! `w_i = clamp(v_i - τ, l_i, u_i)` for the unique shift τ making the weights
//! sum to one. `g(τ) = Σ clamp(v_i - τ, l_i, u_i)` is piecewise linear and
//! non-increasing with breakpoints at `v_i - u_i` and `v_i - l_i`, so τ is
//! found exactly by locating the segment that crosses 1.
//!
//! When `v` is large relative to the bounds, `v_i - τ` cancels and the clamped
//! weights can miss the budget by more than rounding. The residual is then
//! spread over the coordinates strictly inside their bounds.

use ndarray::Array1;

/// Residual redistribution passes after clamping.
const POLISH_PASSES: usize = 3;

fn budget(v: &Array1<f64>, lower: &Array1<f64>, upper: &Array1<f64>, tau: f64) -> f64 {
    v.iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(&vi, (&l, &u))| (vi - tau).clamp(l, u))
        .sum()
}

/// Project `v` onto `{ l ≤ w ≤ u, Σ w = 1 }`.
///
/// The bounds must be feasible (`Σ l ≤ 1 ≤ Σ u`, `l ≤ u`);
/// [`Bounds`](crate::Bounds) guarantees this on construction.
pub fn project_capped_simplex(
    v: &Array1<f64>,
    lower: &Array1<f64>,
    upper: &Array1<f64>,
) -> Array1<f64> {
    if v.is_empty() {
        return Array1::zeros(0);
    }
    let mut breakpoints: Vec<f64> = v
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .flat_map(|(&vi, (&l, &u))| [vi - u, vi - l])
        .collect();
    breakpoints.sort_by(f64::total_cmp);

    // Largest k with g(b_k) >= 1; g(b_0) = Σu >= 1 for feasible bounds
    let k = breakpoints
        .partition_point(|&b| budget(v, lower, upper, b) >= 1.0)
        .saturating_sub(1);

    let b_k = breakpoints[k];
    let g_k = budget(v, lower, upper, b_k);
    let tau = match breakpoints.get(k + 1) {
        Some(&b_next) if b_next > b_k => {
            let g_next = budget(v, lower, upper, b_next);
            if g_k > g_next {
                b_k + (g_k - 1.0) * (b_next - b_k) / (g_k - g_next)
            } else {
                b_k
            }
        }
        _ => b_k,
    };

    let mut w = Array1::from_iter(
        v.iter()
            .zip(lower.iter().zip(upper.iter()))
            .map(|(&vi, (&l, &u))| (vi - tau).clamp(l, u)),
    );
    polish(&mut w, lower, upper);
    w
}

fn polish(w: &mut Array1<f64>, lower: &Array1<f64>, upper: &Array1<f64>) {
    for _ in 0..POLISH_PASSES {
        let residual = 1.0 - w.sum();
        if residual == 0.0 {
            return;
        }
        let free = w
            .iter()
            .zip(lower.iter().zip(upper.iter()))
            .filter(|&(&wi, (&l, &u))| wi > l && wi < u)
            .count();
        if free == 0 {
            return;
        }
        let shift = residual / free as f64;
        for (wi, (&l, &u)) in w.iter_mut().zip(lower.iter().zip(upper.iter())) {
            if *wi > l && *wi < u {
                *wi = (*wi + shift).clamp(l, u);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn unit(n: usize) -> (Array1<f64>, Array1<f64>) {
        (Array1::zeros(n), Array1::ones(n))
    }

    #[test]
    fn test_feasible_point_unchanged() {
        let (l, u) = unit(3);
        let w = array![0.2, 0.3, 0.5];
        let p = project_capped_simplex(&w, &l, &u);
        for i in 0..3 {
            assert_abs_diff_eq!(p[i], w[i], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_uniform_shift() {
        let (l, u) = unit(3);
        let p = project_capped_simplex(&array![0.5, 0.5, 0.5], &l, &u);
        for i in 0..3 {
            assert_abs_diff_eq!(p[i], 1.0 / 3.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_far_point_goes_to_vertex() {
        let (l, u) = unit(3);
        let p = project_capped_simplex(&array![5.0, 0.0, -2.0], &l, &u);
        assert_abs_diff_eq!(p[0], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(p[1], 0.0);
        assert_abs_diff_eq!(p[2], 0.0);
    }

    #[test]
    fn test_upper_caps() {
        let l = Array1::zeros(3);
        let u = array![0.5, 1.0, 1.0];
        let p = project_capped_simplex(&array![2.0, 0.0, 0.0], &l, &u);
        assert_abs_diff_eq!(p[0], 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(p[1], 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(p[2], 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_lower_floors() {
        let l = array![0.0, 0.3, 0.0];
        let u = Array1::ones(3);
        let p = project_capped_simplex(&array![1.0, 0.0, 0.0], &l, &u);
        assert_abs_diff_eq!(p[0], 0.7, epsilon = 1e-15);
        assert_abs_diff_eq!(p[1], 0.3, epsilon = 1e-15);
        assert_abs_diff_eq!(p[2], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_tight_bounds() {
        // Σl = 1: the only feasible point is l
        let l = array![0.6, 0.4];
        let u = array![1.0, 1.0];
        let p = project_capped_simplex(&array![0.0, 3.0], &l, &u);
        assert_abs_diff_eq!(p[0], 0.6, epsilon = 1e-15);
        assert_abs_diff_eq!(p[1], 0.4, epsilon = 1e-15);
    }

    #[test]
    fn test_large_inputs_keep_budget() {
        // A long gradient step on a linear objective: shift differences of
        // order 1e4 leave one asset between its bounds
        let l = array![0.05, 0.0, 0.0, 0.0];
        let u = array![1.0, 0.4, 1.0, 0.5];
        let v = array![1.0e4 + 0.3, 3.0e4 + 0.1, 2.0e4 + 0.7, -0.5e4];
        let p = project_capped_simplex(&v, &l, &u);
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(p[0], 0.05);
        assert_abs_diff_eq!(p[1], 0.4);
        assert_abs_diff_eq!(p[2], 0.55, epsilon = 1e-15);
        assert_abs_diff_eq!(p[3], 0.0);

        let v = &v * 1e8;
        let p = project_capped_simplex(&v, &l, &u);
        assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(p[2], 0.55, epsilon = 1e-15);
    }

    #[test]
    fn test_projection_properties_on_grid() {
        let l = array![0.0, 0.05, 0.0, 0.1];
        let u = array![0.4, 1.0, 0.5, 0.6];
        for seed in 0..50 {
            let v = Array1::from_shape_fn(4, |i| ((seed * 7 + i * 13) as f64 * 0.91).sin() * 2.0);
            let p = project_capped_simplex(&v, &l, &u);
            assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-12);
            for i in 0..4 {
                assert!(p[i] >= l[i] && p[i] <= u[i]);
            }
        }
    }
}
