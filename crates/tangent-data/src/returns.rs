//! Period return series.

use chrono::NaiveDate;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Period returns indexed by date and asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    values: Array2<f64>,
}

impl ReturnSeries {
    /// Create a return series, checking that dimensions agree.
    pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (dates.len(), assets.len()) {
            return Err(DataError::DimensionMismatch {
                expected: dates.len() * assets.len(),
                actual: values.len(),
            });
        }
        Ok(Self::from_parts(dates, assets, values))
    }

    pub(crate) const fn from_parts(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        values: Array2<f64>,
    ) -> Self {
        Self {
            dates,
            assets,
            values,
        }
    }

    pub(crate) fn empty(assets: Vec<String>) -> Self {
        let n = assets.len();
        Self::from_parts(Vec::new(), assets, Array2::zeros((0, n)))
    }

    /// Row dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Asset identifiers in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Return matrix (dates × assets).
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series has no periods.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Per-asset mean period return.
    pub fn mean(&self) -> Result<Array1<f64>> {
        self.values
            .mean_axis(Axis(0))
            .ok_or(DataError::InsufficientData {
                required: 1,
                actual: 0,
            })
    }

    /// Whether every value is finite.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}
