//! Export functionality for frontiers, allocations and summaries.
//!
//! Every exportable type implements [`Exporter`], producing CSV, compact JSON
//! or pretty JSON. Nested structures are flattened into one CSV row per
//! record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tangent_optimize::{Anchors, Frontier};
use tangent_risk::metrics;
use thiserror::Error;

use crate::{
    allocation::{Allocation, AllocationSnapshot},
    summary::PerformanceSummary,
};

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced invalid UTF-8.
    #[error("Invalid UTF-8 in CSV output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    #[default]
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::PrettyJson => "pretty-json",
        })
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn write_csv<T: Serialize>(records: impl IntoIterator<Item = T>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn write_json<T: Serialize + ?Sized>(value: &T, format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::PrettyJson => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    })
}

/// One efficient-frontier point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontierPointExport {
    /// Target annual return.
    pub expected_return: f64,

    /// Achieved annual standard deviation.
    pub stddev: f64,

    /// Sharpe ratio at the point.
    pub sharpe: Option<f64>,

    /// Whether the solve converged.
    pub success: bool,

    /// Weights in asset order.
    pub weights: Vec<f64>,
}

/// One randomly sampled portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleExport {
    /// Annual expected return.
    pub expected_return: f64,

    /// Annual standard deviation.
    pub stddev: f64,

    /// Sharpe ratio.
    pub sharpe: Option<f64>,
}

/// An anchor portfolio with its holdings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnchorExport {
    /// Performance of the anchor, named after it.
    pub summary: PerformanceSummary,

    /// Non-zero holdings.
    pub allocation: Allocation,
}

impl AnchorExport {
    /// Named summaries and holdings of the three anchors.
    pub fn from_anchors<S: AsRef<str>>(assets: &[S], anchors: &Anchors) -> Vec<Self> {
        anchors
            .labelled()
            .into_iter()
            .map(|(name, anchor)| Self {
                summary: PerformanceSummary::new(name, anchor.stats),
                allocation: Allocation::what_to_buy(assets, &anchor.weights),
            })
            .collect()
    }
}

/// Frontier data for a plotting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontierExport {
    /// Asset order of the weight vectors.
    pub assets: Vec<String>,

    /// Efficient frontier, increasing return.
    pub curve: Vec<FrontierPointExport>,

    /// Random feasible portfolios.
    pub samples: Vec<SampleExport>,

    /// Minimum standard deviation, maximum Sharpe and maximum return portfolios.
    pub anchors: Vec<AnchorExport>,
}

impl FrontierExport {
    /// Flatten a frontier for export.
    ///
    /// # Arguments
    ///
    /// * `assets` - Asset identifiers in weight order
    /// * `frontier` - Solved frontier
    /// * `risk_free_rate` - Annual rate used for the curve's Sharpe ratios
    pub fn new<S: AsRef<str>>(assets: &[S], frontier: &Frontier, risk_free_rate: f64) -> Self {
        let curve = frontier
            .curve
            .iter()
            .map(|p| FrontierPointExport {
                expected_return: p.target_return,
                stddev: p.stddev,
                sharpe: metrics::sharpe(p.target_return, p.stddev, risk_free_rate).ok(),
                success: p.success,
                weights: p.weights.to_vec(),
            })
            .collect();
        let samples = frontier
            .samples
            .iter()
            .map(|s| SampleExport {
                expected_return: s.expected_return,
                stddev: s.stddev,
                sharpe: s.sharpe,
            })
            .collect();
        let anchors = AnchorExport::from_anchors(assets, &frontier.anchors);

        Self {
            assets: assets.iter().map(|a| a.as_ref().to_string()).collect(),
            curve,
            samples,
            anchors,
        }
    }

    fn to_flat_records(&self) -> Vec<FrontierRecord> {
        let curve = self.curve.iter().map(|p| FrontierRecord {
            series: "curve".to_string(),
            expected_return: p.expected_return,
            stddev: p.stddev,
            sharpe: p.sharpe,
        });
        let samples = self.samples.iter().map(|s| FrontierRecord {
            series: "sample".to_string(),
            expected_return: s.expected_return,
            stddev: s.stddev,
            sharpe: s.sharpe,
        });
        let anchors = self.anchors.iter().map(|a| FrontierRecord {
            series: a.summary.name.clone(),
            expected_return: a.summary.expected_return,
            stddev: a.summary.stddev,
            sharpe: a.summary.sharpe,
        });
        curve.chain(samples).chain(anchors).collect()
    }
}

/// Flattened frontier point for CSV export.
#[derive(Debug, Serialize, Deserialize)]
struct FrontierRecord {
    series: String,
    expected_return: f64,
    stddev: f64,
    sharpe: Option<f64>,
}

impl Exporter for FrontierExport {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self.to_flat_records()),
            _ => write_json(self, format),
        }
    }
}

impl Exporter for Allocation {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(&self.holdings),
            _ => write_json(self, format),
        }
    }
}

/// Flattened snapshot holding for CSV export.
#[derive(Debug, Serialize)]
struct SnapshotRecord<'a> {
    buy_date: NaiveDate,
    asset: &'a str,
    weight: f64,
}

impl Exporter for Vec<AllocationSnapshot> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self.iter().flat_map(|snapshot| {
                snapshot.allocation.holdings.iter().map(move |h| SnapshotRecord {
                    buy_date: snapshot.buy_date,
                    asset: &h.asset,
                    weight: h.weight,
                })
            })),
            _ => write_json(self, format),
        }
    }
}

impl Exporter for Vec<PerformanceSummary> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => write_csv(self),
            _ => write_json(self, format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Read;
    use tangent_risk::PortfolioStats;

    fn snapshots() -> Vec<AllocationSnapshot> {
        vec![
            AllocationSnapshot::new(
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                Allocation::what_to_buy(&["AAPL", "TLT"], &array![0.7, 0.3]),
            ),
            AllocationSnapshot::new(
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                Allocation::what_to_buy(&["AAPL", "TLT"], &array![0.0, 1.0]),
            ),
        ]
    }

    #[test]
    fn test_allocation_csv() {
        let allocation = Allocation::what_to_buy(&["AAPL", "MSFT"], &array![0.4, 0.6]);
        let csv = allocation.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv, "asset,weight\nMSFT,0.6\nAAPL,0.4\n");
    }

    #[test]
    fn test_snapshots_csv() {
        let csv = snapshots().export_to_string(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "buy_date,asset,weight");
        assert_eq!(lines[1], "2024-01-31,AAPL,0.7");
        assert_eq!(lines[3], "2024-02-29,TLT,1.0");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_summaries_csv_with_missing_sharpe() {
        let summaries = vec![PerformanceSummary::new(
            "Cash",
            PortfolioStats::new(0.0, 0.0, 0.0),
        )];
        let csv = summaries.export_to_string(ExportFormat::Csv).unwrap();
        assert_eq!(csv, "name,expected_return,stddev,sharpe\nCash,0.0,0.0,\n");
    }

    #[test]
    fn test_pretty_json_is_indented() {
        let json = snapshots().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(json.contains("\n  "));
        let compact = snapshots().export_to_string(ExportFormat::Json).unwrap();
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(
            "pretty-json".parse::<ExportFormat>().unwrap(),
            ExportFormat::PrettyJson
        );
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ExportError::InvalidFormat(_))
        ));
        assert_eq!(ExportFormat::PrettyJson.to_string(), "pretty-json");
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert_eq!(ExportFormat::PrettyJson.extension(), "json");
    }

    #[test]
    fn test_export_to_file() {
        let path = std::env::temp_dir().join("tangent_output_snapshots.csv");
        snapshots().export_to_file(&path, ExportFormat::Csv).unwrap();
        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.starts_with("buy_date,asset,weight"));
        std::fs::remove_file(path).ok();
    }
}
