//! Command reports.
//!
//! A [`Report`] wraps the result of one tangent command with the context
//! needed to reproduce it: the command and crate version, the asset universe
//! and the dated price window the moments came from. Headline performance
//! rows and the holdings to buy are lifted out of the command payload so a
//! report can be rendered as Markdown as well as JSON.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{allocation::Allocation, summary::PerformanceSummary, summary::comparison_markdown};

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required field was not set on the builder.
    #[error("Missing report field: {0}")]
    MissingField(&'static str),
}

/// Dated span of the price rows behind a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceWindow {
    /// First row date
    pub start: NaiveDate,
    /// Last row date
    pub end: NaiveDate,
    /// Number of price rows
    pub rows: usize,
}

impl PriceWindow {
    /// Window covering sorted row `dates`; `None` when there are none.
    pub fn from_dates(dates: &[NaiveDate]) -> Option<Self> {
        Some(Self {
            start: *dates.first()?,
            end: *dates.last()?,
            rows: dates.len(),
        })
    }
}

/// Result of one tangent command with its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Command that produced the report.
    pub command: String,

    /// Version of tangent that produced the report.
    pub version: String,

    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Asset universe analysed.
    pub assets: Vec<String>,

    /// Price rows the estimates were drawn from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<PriceWindow>,

    /// Headline performance rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub summaries: Vec<PerformanceSummary>,

    /// Holdings to buy, largest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holdings: Option<Allocation>,

    /// Full command output.
    pub contents: serde_json::Value,
}

impl Report {
    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the context, performance rows and holdings as Markdown.
    ///
    /// The raw command output is left to the JSON rendering.
    pub fn to_markdown(&self) -> String {
        let mut output = format!("# tangent {}\n\n", self.command);
        output.push_str(&format!(
            "Generated {} by tangent {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.version
        ));
        output.push_str(&format!("Assets: {}\n", self.assets.join(", ")));
        if let Some(window) = &self.window {
            output.push_str(&format!(
                "Prices: {} to {} ({} rows)\n",
                window.start, window.end, window.rows
            ));
        }

        if !self.summaries.is_empty() {
            output.push_str("\n## Performance\n\n");
            output.push_str(&comparison_markdown(&self.summaries));
        }

        if let Some(holdings) = self.holdings.as_ref().filter(|h| !h.is_empty()) {
            output.push_str("\n## Holdings\n\n");
            output.push_str("| Asset | Weight |\n");
            output.push_str("|-------|--------|\n");
            for holding in &holdings.holdings {
                output.push_str(&format!(
                    "| {} | {:.2}% |\n",
                    holding.asset,
                    holding.weight * 100.0
                ));
            }
        }

        output
    }

    /// Write the report, as Markdown for a `.md` path and JSON otherwise.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let path = path.as_ref();
        let body = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("md") => self.to_markdown(),
            _ => self.to_json()?,
        };
        std::fs::write(path, body)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    command: Option<String>,
    assets: Vec<String>,
    window: Option<PriceWindow>,
    summaries: Vec<PerformanceSummary>,
    holdings: Option<Allocation>,
    contents: Option<serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the command name.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Set the asset universe.
    pub fn assets<S: AsRef<str>>(mut self, assets: &[S]) -> Self {
        self.assets = assets.iter().map(|a| a.as_ref().to_string()).collect();
        self
    }

    /// Set the price window.
    pub fn window(mut self, window: impl Into<Option<PriceWindow>>) -> Self {
        self.window = window.into();
        self
    }

    /// Set the headline performance rows.
    pub fn summaries(mut self, summaries: Vec<PerformanceSummary>) -> Self {
        self.summaries = summaries;
        self
    }

    /// Set the holdings to buy.
    pub fn holdings(mut self, holdings: Allocation) -> Self {
        self.holdings = Some(holdings);
        self
    }

    /// Set the report contents from any serializable value.
    pub fn contents<T: Serialize>(mut self, contents: &T) -> Result<Self, ReportError> {
        self.contents = Some(serde_json::to_value(contents)?);
        Ok(self)
    }

    /// Build the report, stamped with the current time.
    pub fn build(self) -> Result<Report, ReportError> {
        Ok(Report {
            command: self.command.ok_or(ReportError::MissingField("command"))?,
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            assets: self.assets,
            window: self.window,
            summaries: self.summaries,
            holdings: self.holdings,
            contents: self.contents.unwrap_or(serde_json::Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tangent_risk::PortfolioStats;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn optimize_report() -> Report {
        ReportBuilder::new()
            .command("optimize")
            .assets(&["AAPL", "MSFT", "XOM"])
            .window(PriceWindow::from_dates(&[date(1), date(4), date(5)]))
            .summaries(vec![
                PerformanceSummary::new("SPY", PortfolioStats::new(0.08, 0.16, 0.02)),
                PerformanceSummary::new("Portfolio", PortfolioStats::new(0.12, 0.2, 0.02)),
            ])
            .holdings(Allocation::what_to_buy(
                &["AAPL", "MSFT", "XOM"],
                &array![0.25, 0.75, 0.0],
            ))
            .contents(&serde_json::json!({"target_return": 0.1}))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_report_builder() {
        let report = optimize_report();

        assert_eq!(report.command, "optimize");
        assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(report.assets, vec!["AAPL", "MSFT", "XOM"]);
        assert_eq!(
            report.window,
            Some(PriceWindow {
                start: date(1),
                end: date(5),
                rows: 3
            })
        );
        assert_eq!(report.contents["target_return"], 0.1);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["window"]["start"], "2024-03-01");
        assert_eq!(json["summaries"][1]["name"], "Portfolio");
        assert_eq!(json["holdings"][0]["asset"], "MSFT");
        assert!(json.get("generated_at").is_some());
    }

    #[test]
    fn test_markdown_rendering() {
        let markdown = optimize_report().to_markdown();

        assert!(markdown.starts_with("# tangent optimize\n"));
        assert!(markdown.contains("Assets: AAPL, MSFT, XOM\n"));
        assert!(markdown.contains("Prices: 2024-03-01 to 2024-03-05 (3 rows)\n"));
        assert!(markdown.contains("## Performance"));
        assert!(markdown.contains("| Portfolio | 12.00% | 20.00% | 0.500 |"));
        assert!(markdown.contains("| MSFT | 75.00% |\n| AAPL | 25.00% |\n"));
        assert!(!markdown.contains("XOM |"));
    }

    #[test]
    fn test_sparse_report_omits_sections() {
        let report = ReportBuilder::new().command("views").build().unwrap();
        assert_eq!(report.contents, serde_json::Value::Null);

        let json = report.to_json().unwrap();
        assert!(!json.contains("\"window\""));
        assert!(!json.contains("\"summaries\""));
        assert!(!json.contains("\"holdings\""));

        let markdown = report.to_markdown();
        assert!(!markdown.contains("Prices:"));
        assert!(!markdown.contains("## Holdings"));
    }

    #[test]
    fn test_window_needs_rows() {
        assert_eq!(PriceWindow::from_dates(&[]), None);
    }

    #[test]
    fn test_missing_command() {
        assert!(matches!(
            ReportBuilder::new().build(),
            Err(ReportError::MissingField("command"))
        ));
    }
}
