//! "What to buy" allocation lists.

use std::fmt;

use chrono::NaiveDate;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Decimal places kept in reported weights.
pub const WEIGHT_DECIMALS: i32 = 4;

/// One asset and its portfolio weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Holding {
    /// Asset identifier.
    pub asset: String,

    /// Weight in the portfolio (0.0 to 1.0).
    pub weight: f64,
}

impl Holding {
    /// Create a new holding.
    pub const fn new(asset: String, weight: f64) -> Self {
        Self { asset, weight }
    }
}

/// Non-zero holdings of a portfolio, largest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Allocation {
    /// Holdings sorted by descending weight.
    pub holdings: Vec<Holding>,
}

fn round_weight(weight: f64) -> f64 {
    let scale = 10f64.powi(WEIGHT_DECIMALS);
    (weight * scale).round() / scale
}

impl Allocation {
    /// Build the list of assets to buy from solver weights.
    ///
    /// Weights are rounded to four decimals, zero weights are dropped and
    /// the rest are sorted by descending weight (ties keep asset order).
    ///
    /// # Arguments
    ///
    /// * `assets` - Asset identifiers in weight order
    /// * `weights` - Portfolio weights
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::array;
    /// use tangent_output::Allocation;
    ///
    /// let assets = ["AAPL".to_string(), "XOM".to_string(), "TLT".to_string()];
    /// let allocation = Allocation::what_to_buy(&assets, &array![0.25, 0.0000049, 0.7499951]);
    ///
    /// assert_eq!(allocation.len(), 2);
    /// assert_eq!(allocation.holdings[0].asset, "TLT");
    /// assert_eq!(allocation.holdings[0].weight, 0.75);
    /// ```
    pub fn what_to_buy<S: AsRef<str>>(assets: &[S], weights: &Array1<f64>) -> Self {
        let mut holdings: Vec<Holding> = assets
            .iter()
            .zip(weights.iter())
            .map(|(asset, &w)| Holding::new(asset.as_ref().to_string(), round_weight(w)))
            .filter(|h| h.weight != 0.0)
            .collect();
        holdings.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        Self { holdings }
    }

    /// Number of holdings.
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Sum of the rounded weights.
    pub fn total_weight(&self) -> f64 {
        self.holdings.iter().map(|h| h.weight).sum()
    }

    /// Weight of `asset`, if held.
    pub fn weight_of(&self, asset: &str) -> Option<f64> {
        self.holdings
            .iter()
            .find(|h| h.asset.eq_ignore_ascii_case(asset))
            .map(|h| h.weight)
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for holding in &self.holdings {
            writeln!(f, "{:<10} {:>8.2}%", holding.asset, holding.weight * 100.0)?;
        }
        Ok(())
    }
}

/// Allocation bought on a given date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationSnapshot {
    /// Date the allocation is bought (last day of its training data).
    pub buy_date: NaiveDate,

    /// Holdings bought.
    pub allocation: Allocation,
}

impl AllocationSnapshot {
    /// Create a new snapshot.
    pub const fn new(buy_date: NaiveDate, allocation: Allocation) -> Self {
        Self {
            buy_date,
            allocation,
        }
    }
}
