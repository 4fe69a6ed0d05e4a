//! Symmetric matrix utilities
//!
//! Eigen-decomposition, conditioning and inversion of covariance-like
//! matrices, implemented directly on `ndarray` without a LAPACK binding.

use super::CovarianceError;
use ndarray::{Array1, Array2};

/// Default number of cyclic Jacobi sweeps.
pub const DEFAULT_MAX_SWEEPS: usize = 100;

/// Default relative tolerance on the off-diagonal Frobenius norm.
pub const DEFAULT_TOLERANCE: f64 = 1e-14;

/// Smallest admissible Cholesky pivot relative to the largest diagonal entry.
const MIN_RELATIVE_PIVOT: f64 = 1e-12;

/// Result of eigenvalue decomposition
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    /// Eigenvalues (sorted in descending order)
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors (columns are eigenvectors)
    pub eigenvectors: Array2<f64>,
}

fn check_square(matrix: &Array2<f64>) -> Result<usize, CovarianceError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(CovarianceError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }
    Ok(n)
}

/// Whether a square matrix is symmetric up to a relative tolerance.
pub fn is_symmetric(matrix: &Array2<f64>, tolerance: f64) -> bool {
    if matrix.nrows() != matrix.ncols() {
        return false;
    }
    let scale = matrix.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);
    let n = matrix.nrows();
    (0..n).all(|i| (i + 1..n).all(|j| (matrix[[i, j]] - matrix[[j, i]]).abs() <= tolerance * scale))
}

/// Cyclic Jacobi eigenvalue decomposition for symmetric matrices
///
/// Each sweep rotates away every off-diagonal pair in row order. Iteration
/// stops once the off-diagonal Frobenius norm falls below
/// `tolerance * ||A||_F`, so the stopping rule does not depend on the scale
/// of the entries (daily return covariances are of order 1e-4).
///
/// # Arguments
/// * `matrix` - Symmetric matrix to decompose
/// * `max_sweeps` - Maximum number of full sweeps
/// * `tolerance` - Relative convergence tolerance
///
/// # Returns
/// * Eigenvalues (descending) and the matching eigenvectors
pub fn jacobi_eigendecomp(
    matrix: &Array2<f64>,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<EigenDecomposition, CovarianceError> {
    let n = check_square(matrix)?;

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = frobenius_norm(&a);

    for _sweep in 0..max_sweeps {
        if off_diagonal_norm(&a) <= tolerance * scale {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]] == 0.0 {
                    continue;
                }
                let (cos_theta, sin_theta) = compute_rotation(a[[p, p]], a[[q, q]], a[[p, q]]);
                apply_jacobi_rotation(&mut a, &mut v, p, q, cos_theta, sin_theta);
            }
        }
    }

    let eigenvalues: Array1<f64> = a.diag().to_owned();
    let mut indices: Vec<usize> = (0..n).collect();
    indices.sort_by(|&i, &j| eigenvalues[j].total_cmp(&eigenvalues[i]));

    let sorted_eigenvalues = indices.iter().map(|&i| eigenvalues[i]).collect();
    let mut sorted_eigenvectors = Array2::<f64>::zeros((n, n));
    for (new_idx, &old_idx) in indices.iter().enumerate() {
        sorted_eigenvectors
            .column_mut(new_idx)
            .assign(&v.column(old_idx));
    }

    Ok(EigenDecomposition {
        eigenvalues: sorted_eigenvalues,
        eigenvectors: sorted_eigenvectors,
    })
}

fn frobenius_norm(matrix: &Array2<f64>) -> f64 {
    matrix.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn off_diagonal_norm(matrix: &Array2<f64>) -> f64 {
    matrix
        .indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, v)| v * v)
        .sum::<f64>()
        .sqrt()
}

/// Rotation (cos, sin) that annihilates `a[p][q]`
fn compute_rotation(app: f64, aqq: f64, apq: f64) -> (f64, f64) {
    let theta = (aqq - app) / (2.0 * apq);
    let t = theta.signum() / (theta.abs() + theta.mul_add(theta, 1.0).sqrt());
    let cos_theta = 1.0 / t.mul_add(t, 1.0).sqrt();
    (cos_theta, t * cos_theta)
}

fn apply_jacobi_rotation(
    a: &mut Array2<f64>,
    v: &mut Array2<f64>,
    p: usize,
    q: usize,
    c: f64,
    s: f64,
) {
    let n = a.nrows();
    let app = a[[p, p]];
    let aqq = a[[q, q]];
    let apq = a[[p, q]];

    a[[p, p]] = c * c * app - 2.0 * c * s * apq + s * s * aqq;
    a[[q, q]] = s * s * app + 2.0 * c * s * apq + c * c * aqq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for i in 0..n {
        if i != p && i != q {
            let aip = a[[i, p]];
            let aiq = a[[i, q]];
            a[[i, p]] = c * aip - s * aiq;
            a[[p, i]] = a[[i, p]];
            a[[i, q]] = s * aip + c * aiq;
            a[[q, i]] = a[[i, q]];
        }
    }

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];
        v[[i, p]] = c * vip - s * viq;
        v[[i, q]] = s * vip + c * viq;
    }
}

/// Compute the condition number of a symmetric matrix
///
/// Ratio of the largest to the smallest absolute eigenvalue; infinity when
/// the smallest is zero relative to the largest.
pub fn condition_number(matrix: &Array2<f64>) -> f64 {
    match jacobi_eigendecomp(matrix, DEFAULT_MAX_SWEEPS, DEFAULT_TOLERANCE) {
        Ok(decomp) => {
            let abs = decomp.eigenvalues.mapv(f64::abs);
            let max_eig = abs.iter().copied().fold(0.0, f64::max);
            let min_eig = abs.iter().copied().fold(f64::INFINITY, f64::min);
            if max_eig == 0.0 || min_eig <= max_eig * f64::EPSILON {
                f64::INFINITY
            } else {
                max_eig / min_eig
            }
        }
        Err(_) => f64::INFINITY,
    }
}

/// Check if a symmetric matrix is positive definite
///
/// Attempts a Cholesky factorisation.
pub fn is_positive_definite(matrix: &Array2<f64>) -> bool {
    cholesky(matrix).is_ok()
}

/// Cholesky factorisation `A = L Lᵀ` of a symmetric positive definite matrix
///
/// # Returns
/// * Lower-triangular factor `L`, or [`CovarianceError::SingularMatrix`] if a
///   pivot is not positive relative to the matrix scale
pub fn cholesky(matrix: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
    let n = check_square(matrix)?;
    let max_diag = matrix.diag().iter().copied().fold(0.0, f64::max);
    let threshold = max_diag * MIN_RELATIVE_PIVOT;

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let mut pivot = matrix[[j, j]];
        for k in 0..j {
            pivot -= l[[j, k]] * l[[j, k]];
        }
        if !pivot.is_finite() || pivot <= threshold {
            return Err(CovarianceError::SingularMatrix {
                condition_number: condition_number(matrix),
            });
        }
        let diag = pivot.sqrt();
        l[[j, j]] = diag;

        for i in (j + 1)..n {
            let mut sum = matrix[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = sum / diag;
        }
    }
    Ok(l)
}

/// Invert a symmetric positive definite matrix through its Cholesky factor
///
/// Solves `L y = e_i` and `Lᵀ x = y` for every unit vector.
pub fn invert_spd(matrix: &Array2<f64>) -> Result<Array2<f64>, CovarianceError> {
    let l = cholesky(matrix)?;
    let n = l.nrows();
    let mut inverse = Array2::<f64>::zeros((n, n));

    for col in 0..n {
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let mut sum = if i == col { 1.0 } else { 0.0 };
            for k in 0..i {
                sum -= l[[i, k]] * y[k];
            }
            y[i] = sum / l[[i, i]];
        }
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n {
                sum -= l[[k, i]] * inverse[[k, col]];
            }
            inverse[[i, col]] = sum / l[[i, i]];
        }
    }

    Ok((&inverse + &inverse.t()) / 2.0)
}
