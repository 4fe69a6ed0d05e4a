//! Integration tests for frontier export and performance tables.

use approx::assert_abs_diff_eq;
use ndarray::array;
use tangent_optimize::{FrontierBuilder, FrontierConfig, PortfolioOptimizer};
use tangent_output::{ExportFormat, Exporter, FrontierExport, PerformanceSummary, comparison_table};
use tangent_risk::AssetMoments;

fn moments() -> AssetMoments {
    AssetMoments::new(
        vec!["AAPL".into(), "XOM".into(), "TLT".into()],
        array![0.0010, 0.0006, 0.0002],
        array![
            [0.00040, 0.00008, -0.00002],
            [0.00008, 0.00025, 0.00001],
            [-0.00002, 0.00001, 0.00008]
        ],
    )
    .unwrap()
}

#[test]
fn test_frontier_export_workflow() {
    let m = moments();
    let optimizer = PortfolioOptimizer::new(&m).unwrap();
    let config = FrontierConfig {
        points: 8,
        samples: 100,
        seed: Some(3),
        ..Default::default()
    };
    let frontier = FrontierBuilder::new(&optimizer, config).build(0.01).unwrap();
    let export = FrontierExport::new(m.assets(), &frontier, 0.01);

    assert_eq!(export.curve.len(), 8);
    assert_eq!(export.samples.len(), 100);
    let names: Vec<&str> = export.anchors.iter().map(|a| a.summary.name.as_str()).collect();
    assert_eq!(names, vec!["min_stddev", "max_sharpe", "max_return"]);

    // The maximum return anchor holds only the best asset
    let max_return = &export.anchors[2];
    assert_eq!(max_return.allocation.len(), 1);
    assert_eq!(max_return.allocation.holdings[0].asset, "AAPL");
    assert_abs_diff_eq!(max_return.summary.expected_return, 0.252, epsilon = 1e-9);

    let csv = export.export_to_string(ExportFormat::Csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "series,expected_return,stddev,sharpe");
    assert_eq!(lines.len(), 1 + 8 + 100 + 3);
    assert!(lines[1].starts_with("curve,"));
    assert!(lines.last().unwrap().starts_with("max_return,"));

    let json = export.export_to_string(ExportFormat::Json).unwrap();
    let back: FrontierExport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.assets, vec!["AAPL", "XOM", "TLT"]);
    assert_eq!(back.anchors.len(), 3);
}

#[test]
fn test_benchmark_comparison_table() {
    let m = moments();
    let benchmark = PerformanceSummary::new("AAPL", m.stats(&array![1.0, 0.0, 0.0], 0.0).unwrap());
    let portfolio = PerformanceSummary::new(
        "Portfolio",
        m.stats(&array![0.3, 0.3, 0.4], 0.0).unwrap(),
    );
    let table = comparison_table(&[benchmark, portfolio]);
    assert!(table.contains("AAPL"));
    assert!(table.contains("Portfolio"));
    assert!(table.contains("25.20%"));
}
