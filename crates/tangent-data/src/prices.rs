//! Date-indexed price tables.
//!
//! A [`PriceTable`] stores adjusted closing prices with one row per trading
//! day and one column per asset. Missing prices are `NaN`; callers decide
//! whether to drop incomplete assets or incomplete rows before computing
//! anything that needs a full cross-section.

use std::{io::Read, ops::Range, path::Path};

use chrono::{Duration, NaiveDate};
use ndarray::{Array2, ArrayView1, Axis, Slice};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DataError, Result},
    returns::ReturnSeries,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Adjusted closing prices indexed by date and asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    prices: Array2<f64>,
}

impl PriceTable {
    /// Create a price table from its parts.
    ///
    /// # Arguments
    /// * `dates` - Strictly increasing row dates
    /// * `assets` - Column identifiers, unique
    /// * `prices` - Price matrix (dates × assets), `NaN` for missing values
    ///
    /// # Returns
    /// The table, or an error if the dimensions disagree, a date is out of
    /// order or an asset is listed twice.
    pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, prices: Array2<f64>) -> Result<Self> {
        if prices.nrows() != dates.len() {
            return Err(DataError::DimensionMismatch {
                expected: dates.len(),
                actual: prices.nrows(),
            });
        }
        if prices.ncols() != assets.len() {
            return Err(DataError::DimensionMismatch {
                expected: assets.len(),
                actual: prices.ncols(),
            });
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DataError::UnsortedDates {
                    previous: pair[0].to_string(),
                    next: pair[1].to_string(),
                });
            }
        }
        for (i, asset) in assets.iter().enumerate() {
            if assets[..i].iter().any(|a| a.eq_ignore_ascii_case(asset)) {
                return Err(DataError::DuplicateAsset(asset.clone()));
            }
        }

        Ok(Self {
            dates,
            assets,
            prices,
        })
    }

    /// Read a price table from CSV.
    ///
    /// The header must be `date,<asset>,<asset>,...`. Dates use ISO format
    /// (`YYYY-MM-DD`, an optional time suffix is ignored). Blank cells and
    /// `NaN` are treated as missing prices.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        if headers.len() < 2 {
            return Err(DataError::Parse(
                "header must contain a date column and at least one asset".to_string(),
            ));
        }
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut dates = Vec::new();
        let mut values = Vec::new();
        for record in csv.records() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(DataError::DimensionMismatch {
                    expected: headers.len(),
                    actual: record.len(),
                });
            }
            dates.push(parse_date(&record[0])?);
            for cell in record.iter().skip(1) {
                values.push(parse_price(cell)?);
            }
        }

        let prices = Array2::from_shape_vec((dates.len(), assets.len()), values)
            .map_err(|e| DataError::Parse(e.to_string()))?;
        let table = Self::new(dates, assets, prices)?;
        tracing::debug!(
            rows = table.len(),
            assets = table.assets.len(),
            "loaded price table"
        );
        Ok(table)
    }

    /// Read a price table from a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Row dates.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Asset identifiers in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Raw price matrix (dates × assets).
    pub const fn prices(&self) -> &Array2<f64> {
        &self.prices
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Date of the last row, if any.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Price column for an asset (case-insensitive lookup).
    pub fn column(&self, asset: &str) -> Option<ArrayView1<'_, f64>> {
        self.position(asset).map(|j| self.prices.column(j))
    }

    fn position(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a.eq_ignore_ascii_case(asset))
    }

    /// Restrict the table to the given assets, in the given order.
    ///
    /// Lookup is case-insensitive; the stored asset names are kept.
    pub fn select<S: AsRef<str>>(&self, assets: &[S]) -> Result<Self> {
        let mut indices = Vec::with_capacity(assets.len());
        for asset in assets {
            let asset = asset.as_ref();
            let j = self
                .position(asset)
                .ok_or_else(|| DataError::UnknownAsset(asset.to_string()))?;
            if indices.contains(&j) {
                return Err(DataError::DuplicateAsset(asset.to_string()));
            }
            indices.push(j);
        }
        Ok(self.take_columns(&indices))
    }

    /// Keep the rows dated strictly after `last_date - 365 * years` days.
    pub fn lookback_years(&self, years: f64) -> Result<Self> {
        if !years.is_finite() || years <= 0.0 {
            return Err(DataError::InvalidLookback(years));
        }
        let Some(last) = self.last_date() else {
            return Ok(self.clone());
        };
        let cutoff = last - Duration::days((365.0 * years).round() as i64);
        let start = self.dates.partition_point(|d| *d <= cutoff);
        Ok(self.slice_rows(start..self.len()))
    }

    /// Rows in `range`, clamped to the table length.
    pub fn slice_rows(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self {
            dates: self.dates[start..end].to_vec(),
            assets: self.assets.clone(),
            prices: self
                .prices
                .slice_axis(Axis(0), Slice::from(start..end))
                .to_owned(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Self {
        self.slice_rows(0..n)
    }

    /// Last `n` rows.
    pub fn tail(&self, n: usize) -> Self {
        self.slice_rows(self.len().saturating_sub(n)..self.len())
    }

    /// Drop every asset with at least one missing price.
    pub fn drop_incomplete_assets(&self) -> Self {
        let keep: Vec<usize> = (0..self.assets.len())
            .filter(|&j| self.prices.column(j).iter().all(|p| p.is_finite()))
            .collect();
        self.take_columns(&keep)
    }

    /// Drop every row with at least one missing price.
    pub fn drop_incomplete_rows(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.prices.row(i).iter().all(|p| p.is_finite()))
            .collect();
        Self {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            assets: self.assets.clone(),
            prices: self.prices.select(Axis(0), &keep),
        }
    }

    /// Simple period returns `p_t / p_{t-1} - 1`.
    ///
    /// The result has one row fewer than the table and is dated by the later
    /// day of each pair. Missing prices propagate as `NaN` returns.
    pub fn returns(&self) -> ReturnSeries {
        if self.len() < 2 {
            return ReturnSeries::empty(self.assets.clone());
        }
        let current = self.prices.slice_axis(Axis(0), Slice::from(1_usize..));
        let previous = self.prices.slice_axis(Axis(0), Slice::from(..-1_isize));
        let values = &current / &previous - 1.0;
        ReturnSeries::from_parts(self.dates[1..].to_vec(), self.assets.clone(), values)
    }

    fn take_columns(&self, indices: &[usize]) -> Self {
        Self {
            dates: self.dates.clone(),
            assets: indices.iter().map(|&j| self.assets[j].clone()).collect(),
            prices: self.prices.select(Axis(1), indices),
        }
    }
}

fn parse_date(cell: &str) -> Result<NaiveDate> {
    let day = cell.get(..10).unwrap_or(cell);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map_err(|e| DataError::Parse(format!("invalid date '{cell}': {e}")))
}

fn parse_price(cell: &str) -> Result<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|e| DataError::Parse(format!("invalid price '{cell}': {e}")))
}
