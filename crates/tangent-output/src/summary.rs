//! Performance summaries.
//!
//! A [`PerformanceSummary`] is the annualised return, standard deviation and
//! Sharpe ratio of one named portfolio (or benchmark), with terminal and
//! Markdown renderings for one or several summaries side by side.

use serde::{Deserialize, Serialize};
use std::fmt;
use tangent_risk::PortfolioStats;

/// Annualised performance of a named portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    /// Portfolio or benchmark name.
    pub name: String,

    /// Annualised expected (or realised) return.
    pub expected_return: f64,

    /// Annualised standard deviation.
    pub stddev: f64,

    /// Sharpe ratio; absent when the standard deviation is zero.
    pub sharpe: Option<f64>,
}

impl PerformanceSummary {
    /// Create a new performance summary.
    ///
    /// # Arguments
    ///
    /// * `name` - Portfolio or benchmark name
    /// * `stats` - Annualised return, standard deviation and Sharpe ratio
    ///
    /// # Examples
    ///
    /// ```
    /// use tangent_output::PerformanceSummary;
    /// use tangent_risk::PortfolioStats;
    ///
    /// let summary = PerformanceSummary::new("Portfolio", PortfolioStats::new(0.12, 0.2, 0.02));
    ///
    /// assert_eq!(summary.name, "Portfolio");
    /// assert!((summary.sharpe.unwrap() - 0.5).abs() < 1e-12);
    /// ```
    pub fn new(name: impl Into<String>, stats: PortfolioStats) -> Self {
        Self {
            name: name.into(),
            expected_return: stats.expected_return,
            stddev: stats.stddev,
            sharpe: stats.sharpe,
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        comparison_table(std::slice::from_ref(self))
    }

    /// Format as Markdown for documentation.
    pub fn to_markdown(&self) -> String {
        comparison_markdown(std::slice::from_ref(self))
    }
}

fn format_sharpe(sharpe: Option<f64>) -> String {
    sharpe.map_or_else(|| "n/a".to_string(), |s| format!("{s:.3}"))
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: return {:.2}%, stddev {:.2}%, Sharpe {}",
            self.name,
            self.expected_return * 100.0,
            self.stddev * 100.0,
            format_sharpe(self.sharpe)
        )
    }
}

/// Side-by-side ASCII table of several summaries.
pub fn comparison_table(summaries: &[PerformanceSummary]) -> String {
    let mut output = String::new();

    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "{:<24} {:>11} {:>11} {:>10}\n",
        "Portfolio", "Return", "Std Dev", "Sharpe"
    ));
    output.push_str(&"-".repeat(60));
    output.push('\n');

    for summary in summaries {
        output.push_str(&format!(
            "{:<24} {:>10.2}% {:>10.2}% {:>10}\n",
            summary.name,
            summary.expected_return * 100.0,
            summary.stddev * 100.0,
            format_sharpe(summary.sharpe)
        ));
    }

    output.push_str(&"=".repeat(60));
    output.push('\n');

    output
}

/// Markdown table of several summaries.
pub fn comparison_markdown(summaries: &[PerformanceSummary]) -> String {
    let mut output = String::new();

    output.push_str("| Portfolio | Return | Std Dev | Sharpe |\n");
    output.push_str("|-----------|--------|---------|--------|\n");
    for summary in summaries {
        output.push_str(&format!(
            "| {} | {:.2}% | {:.2}% | {} |\n",
            summary.name,
            summary.expected_return * 100.0,
            summary.stddev * 100.0,
            format_sharpe(summary.sharpe)
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_stats() {
        let summary = PerformanceSummary::new("SPY", PortfolioStats::new(0.1, 0.0, 0.0));
        assert_eq!(summary.sharpe, None);
        assert_eq!(
            summary.to_string(),
            "SPY: return 10.00%, stddev 0.00%, Sharpe n/a"
        );
    }

    #[test]
    fn test_ascii_table() {
        let summaries = vec![
            PerformanceSummary::new("Benchmark", PortfolioStats::new(0.08, 0.16, 0.0)),
            PerformanceSummary::new("Portfolio", PortfolioStats::new(0.12, 0.2, 0.0)),
        ];
        let table = comparison_table(&summaries);
        assert!(table.contains("Benchmark"));
        assert!(table.contains("12.00%"));
        assert!(table.contains("0.600"));
        assert_eq!(table.lines().count(), 6);
    }

    #[test]
    fn test_markdown() {
        let summary = PerformanceSummary::new("Portfolio", PortfolioStats::new(-0.05, 0.1, 0.0));
        let md = summary.to_markdown();
        assert!(md.starts_with("| Portfolio | Return |"));
        assert!(md.contains("| Portfolio | -5.00% | 10.00% | -0.500 |"));
    }
}
