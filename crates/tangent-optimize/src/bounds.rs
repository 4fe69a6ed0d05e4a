//! Per-asset weight bounds
//!
//! Every portfolio is fully invested (Σ w = 1) with `l_i ≤ w_i ≤ u_i` and
//! `0 ≤ l_i ≤ u_i ≤ 1`. The bounds are feasible when `Σ l ≤ 1 ≤ Σ u`.

use std::collections::BTreeMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{
    error::{OptimizeError, Result},
    solver::projection::project_capped_simplex,
};

/// Slack allowed when checking bound sums against 1.
const SUM_TOLERANCE: f64 = 1e-12;

/// Optional lower and upper bound for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundOverride {
    /// Minimum weight, if constrained
    pub lower: Option<f64>,
    /// Maximum weight, if constrained
    pub upper: Option<f64>,
}

impl BoundOverride {
    /// Override only the lower bound.
    pub const fn at_least(lower: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: None,
        }
    }

    /// Override only the upper bound.
    pub const fn at_most(upper: f64) -> Self {
        Self {
            lower: None,
            upper: Some(upper),
        }
    }
}

/// Validated, feasible box bounds for a fully-invested portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl Bounds {
    /// Default bounds `[0, 1]` for `n` assets.
    pub fn unit(n: usize) -> Self {
        Self {
            lower: Array1::zeros(n),
            upper: Array1::ones(n),
        }
    }

    /// Bounds from explicit lower and upper vectors.
    ///
    /// # Returns
    /// The bounds, or an error if the lengths differ, any pair lies outside
    /// `0 ≤ l ≤ u ≤ 1`, or no fully-invested portfolio fits.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(OptimizeError::DimensionMismatch {
                expected: lower.len(),
                actual: upper.len(),
            });
        }
        if lower.is_empty() {
            return Err(OptimizeError::EmptyUniverse);
        }
        for (index, (&l, &u)) in lower.iter().zip(upper.iter()).enumerate() {
            if !(l.is_finite() && u.is_finite() && 0.0 <= l && l <= u && u <= 1.0) {
                return Err(OptimizeError::InvalidBounds {
                    index,
                    lower: l,
                    upper: u,
                });
            }
        }
        let lower_sum = lower.sum();
        let upper_sum = upper.sum();
        if lower_sum > 1.0 + SUM_TOLERANCE || upper_sum < 1.0 - SUM_TOLERANCE {
            return Err(OptimizeError::InfeasibleBounds {
                lower_sum,
                upper_sum,
            });
        }
        Ok(Self { lower, upper })
    }

    /// Default bounds with per-asset overrides applied by name.
    ///
    /// Asset names match case-insensitively.
    pub fn with_overrides<S: AsRef<str>>(
        assets: &[S],
        overrides: &BTreeMap<String, BoundOverride>,
    ) -> Result<Self> {
        let mut lower = Array1::zeros(assets.len());
        let mut upper = Array1::ones(assets.len());
        for (name, bound) in overrides {
            let index = assets
                .iter()
                .position(|a| a.as_ref().eq_ignore_ascii_case(name))
                .ok_or_else(|| OptimizeError::UnknownAsset(name.clone()))?;
            if let Some(l) = bound.lower {
                lower[index] = l;
            }
            if let Some(u) = bound.upper {
                upper[index] = u;
            }
        }
        Self::new(lower, upper)
    }

    /// Lower bounds.
    pub const fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper bounds.
    pub const fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether there are no assets.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Nearest fully-invested portfolio within the bounds.
    pub fn project(&self, v: &Array1<f64>) -> Array1<f64> {
        project_capped_simplex(v, &self.lower, &self.upper)
    }

    /// Uniform portfolio `1/n`, projected if the bounds exclude it.
    pub fn initial_point(&self) -> Array1<f64> {
        let n = self.len();
        self.project(&Array1::from_elem(n, 1.0 / n as f64))
    }

    /// Whether `weights` sum to one and respect the bounds within `tolerance`.
    pub fn contains(&self, weights: &Array1<f64>, tolerance: f64) -> bool {
        weights.len() == self.len()
            && (weights.sum() - 1.0).abs() <= tolerance
            && weights
                .iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(&w, (&l, &u))| w >= l - tolerance && w <= u + tolerance)
    }

    /// Exact range of annualised returns reachable under the bounds.
    ///
    /// Solves the two linear programs in closed form: start every asset at
    /// its lower bound, then hand the remaining budget to the best (or worst)
    /// assets first, each up to its upper bound.
    pub fn return_range(&self, mean: &Array1<f64>, periods_per_year: f64) -> Result<(f64, f64)> {
        if mean.len() != self.len() {
            return Err(OptimizeError::DimensionMismatch {
                expected: self.len(),
                actual: mean.len(),
            });
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&i, &j| mean[i].total_cmp(&mean[j]));

        let min = self.greedy_fill(order.iter().copied()).dot(mean) * periods_per_year;
        let max = self.greedy_fill(order.iter().rev().copied()).dot(mean) * periods_per_year;
        Ok((min, max))
    }

    fn greedy_fill(&self, order: impl Iterator<Item = usize>) -> Array1<f64> {
        let mut weights = self.lower.clone();
        let mut remaining = 1.0 - self.lower.sum();
        for i in order {
            if remaining <= 0.0 {
                break;
            }
            let add = (self.upper[i] - self.lower[i]).min(remaining);
            weights[i] += add;
            remaining -= add;
        }
        weights
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            lower: Array1<f64>,
            upper: Array1<f64>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.lower, raw.upper).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_unit_bounds() {
        let b = Bounds::unit(4);
        assert_eq!(b.len(), 4);
        let w = b.initial_point();
        assert!(b.contains(&w, 1e-12));
        assert_relative_eq!(w[0], 0.25);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            Bounds::new(array![0.0, 0.5], array![1.0, 0.4]),
            Err(OptimizeError::InvalidBounds { index: 1, .. })
        ));
        assert!(matches!(
            Bounds::new(array![-0.1, 0.0], array![1.0, 1.0]),
            Err(OptimizeError::InvalidBounds { index: 0, .. })
        ));
        assert!(matches!(
            Bounds::new(array![0.6, 0.5], array![1.0, 1.0]),
            Err(OptimizeError::InfeasibleBounds { .. })
        ));
        assert!(matches!(
            Bounds::new(array![0.0, 0.0], array![0.4, 0.4]),
            Err(OptimizeError::InfeasibleBounds { .. })
        ));
        assert!(matches!(
            Bounds::new(Array1::zeros(0), Array1::zeros(0)),
            Err(OptimizeError::EmptyUniverse)
        ));
    }

    #[test]
    fn test_overrides() {
        let assets = ["AAPL", "MSFT", "XOM"];
        let mut overrides = BTreeMap::new();
        overrides.insert("aapl".to_string(), BoundOverride::at_least(0.2));
        overrides.insert("XOM".to_string(), BoundOverride::at_most(0.1));
        let b = Bounds::with_overrides(&assets, &overrides).unwrap();
        assert_eq!(b.lower(), &array![0.2, 0.0, 0.0]);
        assert_eq!(b.upper(), &array![1.0, 1.0, 0.1]);

        overrides.insert("TSLA".to_string(), BoundOverride::at_least(0.1));
        assert!(matches!(
            Bounds::with_overrides(&assets, &overrides),
            Err(OptimizeError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_initial_point_respects_bounds() {
        let b = Bounds::new(array![0.5, 0.0, 0.0], array![1.0, 0.1, 1.0]).unwrap();
        let w = b.initial_point();
        assert!(b.contains(&w, 1e-12));
        assert!(w[0] >= 0.5);
        assert!(w[1] <= 0.1);
    }

    #[test]
    fn test_return_range() {
        let mean = array![0.001, 0.002, 0.0005];
        let (min, max) = Bounds::unit(3).return_range(&mean, 252.0).unwrap();
        assert_relative_eq!(min, 0.126, epsilon = 1e-12);
        assert_relative_eq!(max, 0.504, epsilon = 1e-12);

        // Best asset capped at 0.5, worst floored at 0.2
        let b = Bounds::new(array![0.0, 0.0, 0.2], array![1.0, 0.5, 1.0]).unwrap();
        let (min, max) = b.return_range(&mean, 252.0).unwrap();
        assert_relative_eq!(min, 252.0 * 0.0005, epsilon = 1e-12);
        assert_relative_eq!(max, 252.0 * (0.5 * 0.002 + 0.3 * 0.001 + 0.2 * 0.0005), epsilon = 1e-12);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Bounds = serde_json::from_str(r#"{"lower":{"v":1,"dim":[2],"data":[0.0,0.0]},"upper":{"v":1,"dim":[2],"data":[1.0,1.0]}}"#).unwrap();
        assert_eq!(ok.len(), 2);
        let bad = serde_json::from_str::<Bounds>(r#"{"lower":{"v":1,"dim":[2],"data":[0.9,0.9]},"upper":{"v":1,"dim":[2],"data":[1.0,1.0]}}"#);
        assert!(bad.is_err());
    }
}
