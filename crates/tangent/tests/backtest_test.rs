//! Walk-forward backtests over synthetic price tables.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use ndarray::Array2;
use tangent::{
    Aggregate, BacktestConfig, BacktestError, Backtester, RoundOutcome, SkipReason, Split,
};
use tangent::data::{MarketCaps, PriceTable};
use tangent::risk::{BlackLittermanReturns, HistoricalMean, View};

fn table(assets: &[&str], values: Array2<f64>) -> PriceTable {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let dates = (0..values.nrows())
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    PriceTable::new(dates, assets.iter().map(|a| a.to_string()).collect(), values).unwrap()
}

fn two_assets(n: usize) -> PriceTable {
    table(
        &["AAA", "BBB"],
        Array2::from_shape_fn((n, 2), |(t, j)| {
            let t = t as f64;
            if j == 0 {
                50.0 * (1.0 + 0.002 * t + 0.03 * (0.8 * t).sin())
            } else {
                80.0 * (1.0 + 0.001 * t + 0.015 * (1.7 * t).cos())
            }
        }),
    )
}

#[test]
fn test_single_window_is_reproducible() {
    let prices = two_assets(300);
    let backtester = Backtester::new(BacktestConfig {
        split: Split::Testing(60),
        ..Default::default()
    });

    let first = backtester.run(&prices, &HistoricalMean).unwrap();
    let second = backtester.run(&prices, &HistoricalMean).unwrap();
    assert_eq!(first, second);

    assert_eq!(first.rounds.len(), 1);
    let round = first.evaluated().next().unwrap();
    assert_eq!(round.training_days, 240);
    assert_eq!(round.testing_days, 60);
    assert_relative_eq!(round.allocation.allocation.total_weight(), 1.0, epsilon = 1e-3);

    let Aggregate::Evaluated { stats, total_days, rounds } = first.aggregate else {
        panic!("expected an evaluated aggregate");
    };
    assert_eq!((total_days, rounds), (60, 1));
    assert_relative_eq!(stats.expected_return, round.stats.expected_return, epsilon = 1e-12);
    assert_relative_eq!(stats.stddev, round.stats.stddev, epsilon = 1e-12);
}

#[test]
fn test_all_rounds_skipped() {
    // BBB has a gap in every testing window, leaving one usable asset
    let mut prices = two_assets(120).prices().clone();
    for t in (85..120).step_by(5) {
        prices[[t, 1]] = f64::NAN;
    }
    let prices = table(&["AAA", "BBB"], prices);
    let config = BacktestConfig {
        split: Split::Training(80),
        rebalancing_period: Some(10),
        ..Default::default()
    };

    let report = Backtester::new(config).run(&prices, &HistoricalMean).unwrap();
    assert_eq!(report.rounds.len(), 4);
    assert!(report.rounds.iter().all(|r| matches!(
        r,
        RoundOutcome::Skipped {
            reason: SkipReason::InsufficientAssets { available: 1 },
            ..
        }
    )));
    assert_eq!(report.aggregate, Aggregate::NoEvaluableRounds);
    assert!(report.allocations().is_empty());
}

#[test]
fn test_black_litterman_returns() {
    let prices = two_assets(200);
    let mut caps = MarketCaps::new();
    caps.insert("AAA", 3.0e11);
    caps.insert("BBB", 1.0e11);
    let views: Vec<View> = vec!["AAA > BBB 0.02".parse().unwrap()];
    let expected = BlackLittermanReturns::new(caps, views);

    let config = BacktestConfig {
        split: Split::Testing(50),
        rebalancing_period: Some(25),
        risk_free_rate: 0.01,
        ..Default::default()
    };
    let report = Backtester::new(config).run(&prices, &expected).unwrap();
    assert_eq!(report.evaluated().count(), 2);
}

#[test]
fn test_missing_market_cap_fails_round() {
    let prices = two_assets(200);
    let mut caps = MarketCaps::new();
    caps.insert("AAA", 3.0e11);
    let expected = BlackLittermanReturns::new(caps, Vec::new());

    let config = BacktestConfig {
        split: Split::Testing(50),
        ..Default::default()
    };
    let result = Backtester::new(config).run(&prices, &expected);
    assert!(matches!(
        result,
        Err(BacktestError::Round { round: 0, ref source }) if matches!(**source, BacktestError::Risk(_))
    ));
}
