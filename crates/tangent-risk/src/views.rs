//! Investor views for Black-Litterman
//!
//! A view is written as text:
//!
//! - `"AAPL > FB 0.05"`: AAPL outperforms FB by 5% per year
//! - `"AAPL < FB 0.05"`: FB outperforms AAPL by 5% per year
//! - `"GOOGL = 0.35"`: GOOGL returns 35% per year
//!
//! A list of views over an ordered universe becomes a pick matrix P (one row
//! per view) and a view-return vector Q expressed per period.

use std::{fmt, str::FromStr};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::ViewError;

/// A relative or absolute statement about annual expected returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum View {
    /// `outperformer` beats `underperformer` by `annual_return`
    Relative {
        /// Asset expected to do better
        outperformer: String,
        /// Asset expected to do worse
        underperformer: String,
        /// Annual return spread
        annual_return: f64,
    },
    /// `asset` returns `annual_return`
    Absolute {
        /// Asset the view is about
        asset: String,
        /// Annual expected return
        annual_return: f64,
    },
}

impl View {
    /// Relative view `outperformer > underperformer annual_return`.
    pub fn relative(
        outperformer: impl Into<String>,
        underperformer: impl Into<String>,
        annual_return: f64,
    ) -> Self {
        Self::Relative {
            outperformer: outperformer.into(),
            underperformer: underperformer.into(),
            annual_return,
        }
    }

    /// Absolute view `asset = annual_return`.
    pub fn absolute(asset: impl Into<String>, annual_return: f64) -> Self {
        Self::Absolute {
            asset: asset.into(),
            annual_return,
        }
    }

    /// Annual return stated by the view.
    pub const fn annual_return(&self) -> f64 {
        match self {
            Self::Relative { annual_return, .. } | Self::Absolute { annual_return, .. } => {
                *annual_return
            }
        }
    }
}

fn parse_return(token: &str) -> Result<f64, ViewError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
        .ok_or_else(|| ViewError::InvalidReturn(token.to_string()))
}

impl FromStr for View {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice() {
            [a, op, b, r] => {
                let annual_return = parse_return(r)?;
                let view = match *op {
                    ">" => Self::relative(*a, *b, annual_return),
                    "<" => Self::relative(*b, *a, annual_return),
                    "=" => return Err(ViewError::Malformed(s.to_string())),
                    other => return Err(ViewError::UnknownOperator(other.to_string())),
                };
                if a.eq_ignore_ascii_case(b) {
                    return Err(ViewError::SelfComparison((*a).to_string()));
                }
                Ok(view)
            }
            [a, op, r] => match *op {
                "=" => Ok(Self::absolute(*a, parse_return(r)?)),
                ">" | "<" => Err(ViewError::Malformed(s.to_string())),
                other => Err(ViewError::UnknownOperator(other.to_string())),
            },
            _ => Err(ViewError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative {
                outperformer,
                underperformer,
                annual_return,
            } => write!(f, "{outperformer} > {underperformer} {annual_return}"),
            Self::Absolute {
                asset,
                annual_return,
            } => write!(f, "{asset} = {annual_return}"),
        }
    }
}

impl TryFrom<String> for View {
    type Error = ViewError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<View> for String {
    fn from(view: View) -> Self {
        view.to_string()
    }
}

/// Pick matrix P and per-period view returns Q.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewMatrices {
    /// One row per view, one column per asset
    pub pick: Array2<f64>,
    /// Per-period view return for each row of `pick`
    pub returns: Array1<f64>,
}

impl ViewMatrices {
    /// Encode `views` against the ordered `assets`.
    ///
    /// Relative views put +1 on the outperformer and -1 on the
    /// underperformer; absolute views put 1 on their asset. Annual returns
    /// are divided by `periods_per_year`.
    pub fn build<S: AsRef<str>>(
        views: &[View],
        assets: &[S],
        periods_per_year: f64,
    ) -> Result<Self, ViewError> {
        let index_of = |name: &str| {
            assets
                .iter()
                .position(|a| a.as_ref().eq_ignore_ascii_case(name))
                .ok_or_else(|| ViewError::UnknownAsset(name.to_string()))
        };

        let mut pick = Array2::<f64>::zeros((views.len(), assets.len()));
        let mut returns = Array1::<f64>::zeros(views.len());
        for (row, view) in views.iter().enumerate() {
            match view {
                View::Relative {
                    outperformer,
                    underperformer,
                    ..
                } => {
                    let up = index_of(outperformer)?;
                    let down = index_of(underperformer)?;
                    if up == down {
                        return Err(ViewError::SelfComparison(outperformer.clone()));
                    }
                    pick[[row, up]] = 1.0;
                    pick[[row, down]] = -1.0;
                }
                View::Absolute { asset, .. } => {
                    pick[[row, index_of(asset)?]] = 1.0;
                }
            }
            returns[row] = view.annual_return() / periods_per_year;
        }

        Ok(Self { pick, returns })
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    /// Whether there are no views.
    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}
