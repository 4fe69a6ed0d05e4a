//! Tangent CLI binary.
//!
//! Mean-variance allocation, efficient frontiers, Black-Litterman views and
//! walk-forward backtests over a CSV of daily prices.

mod config;

use clap::{ArgAction, Args, Parser, Subcommand};
use config::AppConfig;
use std::{collections::BTreeMap, error::Error, path::PathBuf, process};
use tangent::{
    Advisor, AdvisorRequest, Aggregate, Backtester, RoundOutcome, Split,
    data::{MarketCaps, PriceTable},
    optimize::{BoundOverride, FrontierBuilder, PortfolioOptimizer},
    output::{
        ExportFormat, Exporter, FrontierExport, PerformanceSummary, PriceWindow, ReportBuilder,
        comparison_table,
    },
    risk::{
        AssetMoments, BlackLitterman, BlackLittermanReturns, ExpectedReturns, HistoricalMean, View,
    },
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tangent")]
#[command(about = "Tangent: mean-variance portfolio construction", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct PriceArgs {
    /// Price CSV with a `date` column followed by one column per asset
    #[arg(long)]
    prices: PathBuf,

    /// Comma-separated assets (default: every column)
    #[arg(long, value_delimiter = ',')]
    assets: Vec<String>,
}

impl PriceArgs {
    fn load(&self) -> Result<PriceTable, Box<dyn Error>> {
        let table = PriceTable::from_csv_path(&self.prices)?;
        debug!(rows = table.len(), assets = table.assets().len(), "Loaded price table");
        if self.assets.is_empty() {
            Ok(table)
        } else {
            Ok(table.select(&self.assets)?)
        }
    }
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Market capitalisation CSV with `asset,market_cap` rows
    #[arg(long)]
    market_caps: Option<PathBuf>,

    /// View such as "AAPL > MSFT 0.05" or "GOOGL = 0.35"; repeatable
    #[arg(long = "view")]
    views: Vec<View>,
}

impl ViewArgs {
    /// Black-Litterman returns when market caps are given, historical means otherwise.
    fn expected_returns(
        &self,
        app: &AppConfig,
    ) -> Result<Box<dyn ExpectedReturns>, Box<dyn Error>> {
        match &self.market_caps {
            Some(path) => Ok(Box::new(BlackLittermanReturns {
                market_caps: MarketCaps::from_csv_path(path)?,
                views: self.views.clone(),
                config: app.black_litterman,
            })),
            None if self.views.is_empty() => Ok(Box::new(HistoricalMean)),
            None => Err("Views require --market-caps".into()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend an allocation for a risk factor
    Optimize {
        #[command(flatten)]
        prices: PriceArgs,

        /// Position between minimum risk (0) and maximum return (1)
        #[arg(long, default_value_t = 0.5)]
        risk_factor: f64,

        /// Years of history to estimate from
        #[arg(long, default_value_t = 5.0)]
        years: f64,

        /// Annual risk-free rate
        #[arg(long, default_value_t = 0.025)]
        risk_free_rate: f64,

        /// Benchmark column to report alongside the portfolio
        #[arg(long)]
        benchmark: Option<String>,

        /// Minimum weight as ASSET=WEIGHT; repeatable
        #[arg(long = "min", value_parser = parse_bound)]
        min_weights: Vec<(String, f64)>,

        /// Maximum weight as ASSET=WEIGHT; repeatable
        #[arg(long = "max", value_parser = parse_bound)]
        max_weights: Vec<(String, f64)>,

        #[command(flatten)]
        views: ViewArgs,

        /// Print a JSON report instead of tables
        #[arg(long)]
        json: bool,

        /// Also write a report to this path (Markdown for `.md`, JSON otherwise)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Trace the efficient frontier and sample random portfolios
    Frontier {
        #[command(flatten)]
        prices: PriceArgs,

        /// Years of history to estimate from
        #[arg(long, default_value_t = 5.0)]
        years: f64,

        /// Annual risk-free rate
        #[arg(long, default_value_t = 0.025)]
        risk_free_rate: f64,

        /// Points on the curve
        #[arg(long)]
        points: Option<usize>,

        /// Random portfolios to sample
        #[arg(long)]
        samples: Option<usize>,

        /// Sampler seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output format (csv, json or pretty-json)
        #[arg(long, default_value = "pretty-json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Walk-forward backtest of the maximum Sharpe portfolio
    Backtest {
        #[command(flatten)]
        prices: PriceArgs,

        /// Rows used for the first training window
        #[arg(long, conflicts_with = "testing_period")]
        training_period: Option<usize>,

        /// Rows held out for testing
        #[arg(long)]
        testing_period: Option<usize>,

        /// Rows between rebalances; one testing window when absent
        #[arg(long)]
        rebalancing_period: Option<usize>,

        /// Slide the training window instead of expanding it
        #[arg(long)]
        slicing: bool,

        /// Annual risk-free rate
        #[arg(long)]
        risk_free_rate: Option<f64>,

        #[command(flatten)]
        views: ViewArgs,

        /// Write the allocation of every round to this CSV
        #[arg(long)]
        allocations: Option<PathBuf>,

        /// Print a JSON report instead of tables
        #[arg(long)]
        json: bool,

        /// Also write a report to this path (Markdown for `.md`, JSON otherwise)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Black-Litterman posterior returns
    Views {
        #[command(flatten)]
        prices: PriceArgs,

        /// Market capitalisation CSV with `asset,market_cap` rows
        #[arg(long)]
        market_caps: PathBuf,

        /// View such as "AAPL > MSFT 0.05" or "GOOGL = 0.35"; repeatable
        #[arg(long = "view")]
        views: Vec<View>,

        /// Years of history to estimate from
        #[arg(long, default_value_t = 5.0)]
        years: f64,

        /// Annual risk-free rate
        #[arg(long, default_value_t = 0.025)]
        risk_free_rate: f64,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let app = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Optimize {
            prices,
            risk_factor,
            years,
            risk_free_rate,
            benchmark,
            min_weights,
            max_weights,
            views,
            json,
            report,
        } => {
            let table = PriceTable::from_csv_path(&prices.prices)?;
            let assets = if prices.assets.is_empty() {
                table
                    .assets()
                    .iter()
                    .filter(|a| Some(a.as_str()) != benchmark.as_deref())
                    .cloned()
                    .collect()
            } else {
                prices.assets
            };
            let mut request = AdvisorRequest::new(&assets)
                .with_risk_factor(risk_factor)
                .with_lookback_years(years)
                .with_risk_free_rate(risk_free_rate);
            request.benchmark = benchmark;
            request.bounds = merge_bounds(min_weights, max_weights);

            let expected = views.expected_returns(&app)?;
            let recommendation =
                Advisor::new(app.advisor).recommend_with(&table, &request, expected.as_ref())?;

            let document = ReportBuilder::new()
                .command("optimize")
                .assets(&recommendation.assets)
                .window(recommendation.window)
                .summaries(recommendation.summaries())
                .holdings(recommendation.what_to_buy.clone())
                .contents(&recommendation)?
                .build()?;
            if let Some(path) = report {
                document.write_to_file(&path)?;
                debug!(path = %path.display(), "Wrote report");
            }

            if json {
                println!("{}", document.to_json()?);
            } else {
                print_header(&format!("ALLOCATION: RISK FACTOR {risk_factor:.2}"));
                println!(
                    "Target return: {:.2}%",
                    recommendation.target_return * 100.0
                );
                if !recommendation.anchors_ordered {
                    println!("Warning: anchor returns are not increasing; the risk dial is not monotone");
                }
                println!();
                print!("{}", comparison_table(&recommendation.summaries()));
                println!();
                let anchors: Vec<PerformanceSummary> = recommendation
                    .anchors
                    .iter()
                    .map(|a| a.summary.clone())
                    .collect();
                print!("{}", comparison_table(&anchors));
                println!("\nWhat to buy:");
                print!("{}", recommendation.what_to_buy);
            }
        }
        Commands::Frontier {
            prices,
            years,
            risk_free_rate,
            points,
            samples,
            seed,
            format,
            output,
        } => {
            let table = prices.load()?.lookback_years(years)?.drop_incomplete_rows();
            let moments = AssetMoments::from_returns(&table.returns(), &app.advisor.covariance)?;
            let optimizer =
                PortfolioOptimizer::new(&moments)?.with_solver_config(app.advisor.solver);

            let mut config = app.frontier;
            config.points = points.unwrap_or(config.points);
            config.samples = samples.unwrap_or(config.samples);
            config.seed = seed.or(config.seed);
            let frontier = FrontierBuilder::new(&optimizer, config).build(risk_free_rate)?;
            let export = FrontierExport::new(moments.assets(), &frontier, risk_free_rate);

            match output {
                Some(path) => {
                    export.export_to_file(&path, format)?;
                    println!("Wrote frontier to {}", path.display());
                }
                None => println!("{}", export.export_to_string(format)?),
            }
        }
        Commands::Backtest {
            prices,
            training_period,
            testing_period,
            rebalancing_period,
            slicing,
            risk_free_rate,
            views,
            allocations,
            json,
            report: report_path,
        } => {
            let table = prices.load()?;
            let mut config = app.backtest.clone();
            if let Some(n) = training_period {
                config.split = Split::Training(n);
            }
            if let Some(n) = testing_period {
                config.split = Split::Testing(n);
            }
            config.rebalancing_period = rebalancing_period.or(config.rebalancing_period);
            config.slicing |= slicing;
            config.risk_free_rate = risk_free_rate.unwrap_or(config.risk_free_rate);

            let expected = views.expected_returns(&app)?;
            let report = Backtester::new(config).run(&table, expected.as_ref())?;

            if let Some(path) = allocations {
                report
                    .allocations()
                    .export_to_file(&path, ExportFormat::Csv)?;
            }

            let summaries = match report.aggregate {
                Aggregate::Evaluated { stats, .. } => {
                    vec![PerformanceSummary::new("Backtest", stats)]
                }
                Aggregate::NoEvaluableRounds => Vec::new(),
            };
            let document = ReportBuilder::new()
                .command("backtest")
                .assets(table.assets())
                .window(PriceWindow::from_dates(table.dates()))
                .summaries(summaries)
                .contents(&report)?
                .build()?;
            if let Some(path) = report_path {
                document.write_to_file(&path)?;
                debug!(path = %path.display(), "Wrote report");
            }

            if json {
                println!("{}", document.to_json()?);
            } else {
                print_header("WALK-FORWARD BACKTEST");
                for outcome in &report.rounds {
                    match outcome {
                        RoundOutcome::Evaluated(r) => println!(
                            "Round {:>3}  bought {}  {} days  return {:>7.2}%  stddev {:>6.2}%{}",
                            r.round,
                            r.allocation.buy_date,
                            r.testing_days,
                            r.stats.expected_return * 100.0,
                            r.stats.stddev * 100.0,
                            if r.converged { "" } else { "  (not converged)" }
                        ),
                        RoundOutcome::Skipped { round, reason } => {
                            println!("Round {:>3}  skipped: {}", round, reason)
                        }
                    }
                }
                println!();
                match report.aggregate {
                    Aggregate::Evaluated {
                        stats,
                        total_days,
                        rounds,
                    } => {
                        println!("{rounds} round(s) over {total_days} days");
                        print!(
                            "{}",
                            comparison_table(&[PerformanceSummary::new("Backtest", stats)])
                        );
                    }
                    Aggregate::NoEvaluableRounds => println!("No evaluable rounds"),
                }
            }
        }
        Commands::Views {
            prices,
            market_caps,
            views,
            years,
            risk_free_rate,
        } => {
            let table = prices.load()?.lookback_years(years)?.drop_incomplete_rows();
            let moments = AssetMoments::from_returns(&table.returns(), &app.advisor.covariance)?;
            let weights = MarketCaps::from_csv_path(&market_caps)?.weights_for(moments.assets())?;
            let estimate = BlackLitterman::new(app.black_litterman).estimate(
                &moments,
                &weights,
                risk_free_rate,
                &views,
            )?;

            print_header("BLACK-LITTERMAN RETURNS");
            println!("Implied risk aversion: {:.4}\n", estimate.risk_aversion);
            println!(
                "{:<12} {:>10} {:>12} {:>12}",
                "Asset", "Cap weight", "Equilibrium", "Posterior"
            );
            println!("{}", "-".repeat(49));
            let periods = moments.periods_per_year();
            for (i, asset) in moments.assets().iter().enumerate() {
                println!(
                    "{:<12} {:>9.2}% {:>11.2}% {:>11.2}%",
                    asset,
                    weights[i] * 100.0,
                    estimate.equilibrium[i] * periods * 100.0,
                    estimate.posterior[i] * periods * 100.0
                );
            }
        }
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_header(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

/// Parse `ASSET=WEIGHT`.
fn parse_bound(s: &str) -> Result<(String, f64), String> {
    let (asset, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ASSET=WEIGHT, got '{s}'"))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|e| format!("invalid weight '{weight}': {e}"))?;
    Ok((asset.trim().to_string(), weight))
}

fn merge_bounds(
    min_weights: Vec<(String, f64)>,
    max_weights: Vec<(String, f64)>,
) -> BTreeMap<String, BoundOverride> {
    let mut bounds: BTreeMap<String, BoundOverride> = BTreeMap::new();
    for (asset, lower) in min_weights {
        bounds.entry(asset).or_default().lower = Some(lower);
    }
    for (asset, upper) in max_weights {
        bounds.entry(asset).or_default().upper = Some(upper);
    }
    bounds
}
