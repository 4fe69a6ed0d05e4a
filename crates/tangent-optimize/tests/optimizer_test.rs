//! End-to-end checks of the portfolio problems, frontier and risk dial.

use approx::assert_abs_diff_eq;
use ndarray::{Array1, array};
use rstest::rstest;
use tangent_optimize::{
    Bounds, FrontierBuilder, FrontierConfig, OptimizeError, PortfolioOptimizer, PortfolioProblem,
    RiskDial,
};
use tangent_risk::AssetMoments;

fn two_assets() -> AssetMoments {
    AssetMoments::new(
        vec!["LOW".into(), "HIGH".into()],
        array![0.001, 0.002],
        array![[0.0004, 0.0001], [0.0001, 0.0009]],
    )
    .unwrap()
}

fn four_assets() -> AssetMoments {
    AssetMoments::new(
        vec!["SPY".into(), "AAPL".into(), "XOM".into(), "TLT".into()],
        array![0.0005, 0.0011, 0.0007, 0.0002],
        array![
            [0.00010, 0.00012, 0.00006, -0.00002],
            [0.00012, 0.00040, 0.00005, -0.00001],
            [0.00006, 0.00005, 0.00025, 0.00000],
            [-0.00002, -0.00001, 0.00000, 0.00008]
        ],
    )
    .unwrap()
}

#[test]
fn test_two_asset_min_variance_closed_form() {
    let m = two_assets();
    let result = PortfolioOptimizer::new(&m)
        .unwrap()
        .min_stddev()
        .unwrap()
        .into_checked()
        .unwrap();
    let expected = (0.0009 - 0.0001) / (0.0004 + 0.0009 - 2.0 * 0.0001);
    assert_abs_diff_eq!(result.weights[0], expected, epsilon = 1e-6);
    assert_abs_diff_eq!(result.weights[1], 1.0 - expected, epsilon = 1e-6);
}

#[rstest]
#[case(PortfolioProblem::MinimizeStdDev)]
#[case(PortfolioProblem::MaximizeSharpe { risk_free_rate: 0.02 })]
#[case(PortfolioProblem::MaximizeReturn)]
#[case(PortfolioProblem::EfficientReturn { target: 0.15 })]
#[case(PortfolioProblem::MaximizeUtility { risk_aversion: 2.0 })]
fn test_weights_are_fully_invested_within_bounds(#[case] problem: PortfolioProblem) {
    let m = four_assets();
    let bounds = Bounds::new(array![0.05, 0.0, 0.0, 0.0], array![1.0, 0.4, 1.0, 0.5]).unwrap();
    let optimizer = PortfolioOptimizer::new(&m).unwrap().with_bounds(bounds.clone()).unwrap();
    let result = optimizer.solve(problem).unwrap();
    assert!(result.success, "{}: {}", problem, result.message);
    assert!(bounds.contains(&result.weights, 1e-9));
}

#[test]
fn test_max_sharpe_beats_anchors() {
    let m = four_assets();
    let optimizer = PortfolioOptimizer::new(&m).unwrap();
    let tangency = optimizer.max_sharpe(0.02).unwrap().into_checked().unwrap();
    let best = m.portfolio_sharpe(&tangency.weights, 0.02).unwrap();
    for other in [
        optimizer.min_stddev().unwrap().weights,
        optimizer.max_return().unwrap().weights,
        Array1::from_elem(4, 0.25),
    ] {
        assert!(best >= m.portfolio_sharpe(&other, 0.02).unwrap() - 1e-9);
    }
}

#[test]
fn test_efficient_return_at_min_variance_return() {
    let m = four_assets();
    let optimizer = PortfolioOptimizer::new(&m).unwrap();
    let min = optimizer.min_stddev().unwrap().into_checked().unwrap();
    let target = m.portfolio_return(&min.weights).unwrap();
    let efficient = optimizer.efficient_return(target).unwrap().into_checked().unwrap();
    assert_abs_diff_eq!(
        m.portfolio_stddev(&efficient.weights).unwrap(),
        m.portfolio_stddev(&min.weights).unwrap(),
        epsilon = 1e-6
    );
}

#[test]
fn test_target_outside_bounded_range_is_rejected() {
    let m = four_assets();
    let bounds = Bounds::new(Array1::zeros(4), array![1.0, 0.3, 1.0, 1.0]).unwrap();
    let optimizer = PortfolioOptimizer::new(&m).unwrap().with_bounds(bounds).unwrap();
    let (_, max) = optimizer.return_range().unwrap();
    // 0.3 AAPL + 0.7 XOM
    assert_abs_diff_eq!(max, 252.0 * (0.3 * 0.0011 + 0.7 * 0.0007), epsilon = 1e-12);
    assert!(matches!(
        optimizer.efficient_return(252.0 * 0.0011),
        Err(OptimizeError::TargetOutOfRange { .. })
    ));
    assert!(optimizer.efficient_return(max).unwrap().success);
}

#[test]
fn test_frontier_is_monotone() {
    let m = four_assets();
    let optimizer = PortfolioOptimizer::new(&m).unwrap();
    let config = FrontierConfig {
        points: 12,
        samples: 500,
        seed: Some(42),
        ..Default::default()
    };
    let frontier = FrontierBuilder::new(&optimizer, config).build(0.0).unwrap();

    assert_eq!(frontier.curve.len(), 12);
    assert_eq!(frontier.samples.len(), 500);
    assert!(frontier.curve.iter().all(|p| p.success));
    for pair in frontier.curve.windows(2) {
        assert!(pair[1].target_return > pair[0].target_return);
        assert!(pair[1].stddev >= pair[0].stddev - 1e-7);
    }

    // No sampled portfolio beats the frontier at its own return
    let first = &frontier.curve[0];
    assert_abs_diff_eq!(first.stddev, frontier.anchors.min_stddev.stats.stddev, epsilon = 1e-6);
    for s in &frontier.samples {
        assert!(s.stddev >= first.stddev - 1e-7);
    }
}

#[test]
fn test_risk_dial_endpoints() {
    let m = four_assets();
    let optimizer = PortfolioOptimizer::new(&m).unwrap();

    let safest = RiskDial::resolve(&optimizer, 0.0, 0.0).unwrap();
    assert_abs_diff_eq!(
        safest.stats.stddev,
        safest.anchors.min_stddev.stats.stddev,
        epsilon = 1e-6
    );

    let riskiest = RiskDial::resolve(&optimizer, 1.0, 0.0).unwrap();
    assert_abs_diff_eq!(riskiest.allocation.weights[1], 1.0, epsilon = 1e-6);

    assert!(matches!(
        RiskDial::resolve(&optimizer, 1.5, 0.0),
        Err(OptimizeError::InvalidRiskFactor(_))
    ));
}
