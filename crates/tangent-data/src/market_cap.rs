//! Market capitalisations and market weights.

use std::{collections::BTreeMap, io::Read, path::Path};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Market capitalisation per asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketCaps {
    caps: BTreeMap<String, f64>,
}

impl MarketCaps {
    /// Create an empty set of market caps.
    pub const fn new() -> Self {
        Self {
            caps: BTreeMap::new(),
        }
    }

    /// Insert or replace the capitalisation of an asset.
    pub fn insert(&mut self, asset: impl Into<String>, cap: f64) {
        self.caps.insert(asset.into(), cap);
    }

    /// Capitalisation of an asset (case-insensitive lookup).
    pub fn get(&self, asset: &str) -> Option<f64> {
        self.caps
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(asset))
            .map(|(_, cap)| *cap)
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// Whether no caps are stored.
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    /// Read market caps from a two-column CSV (`asset,market_cap`).
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut caps = Self::new();
        for record in csv.deserialize::<(String, f64)>() {
            let (asset, cap) = record?;
            caps.insert(asset, cap);
        }
        Ok(caps)
    }

    /// Read market caps from a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv_reader(std::fs::File::open(path)?)
    }

    /// Market weights for `assets`, in that order, normalised to sum to 1.
    ///
    /// Every requested asset must have a finite, strictly positive cap.
    pub fn weights_for<S: AsRef<str>>(&self, assets: &[S]) -> Result<Array1<f64>> {
        let mut weights = Array1::zeros(assets.len());
        for (w, asset) in weights.iter_mut().zip(assets) {
            let asset = asset.as_ref();
            let cap = self
                .get(asset)
                .ok_or_else(|| DataError::MissingMarketCap(asset.to_string()))?;
            if !cap.is_finite() || cap <= 0.0 {
                return Err(DataError::InvalidMarketCap {
                    asset: asset.to_string(),
                    value: cap,
                });
            }
            *w = cap;
        }
        let total = weights.sum();
        Ok(weights / total)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MarketCaps {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            caps: iter.into_iter().map(|(a, c)| (a.into(), c)).collect(),
        }
    }
}
