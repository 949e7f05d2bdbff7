//! stockscan - weekly equity scanner, walk-forward backtester and outcome evaluator.
//!
//! # Usage
//! ```sh
//! MODE=mock stockscan scan --limit 20 --top 10
//! stockscan backtest AAPL --start-year 2012 --end-year 2024
//! stockscan evaluate --max-days 10 --metrics
//! ```
//!
//! Configuration comes from the environment and `.env`; flags override it per run.

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use stockscan::application::ScannerContext;
use stockscan::config::Config;
use stockscan::domain::scanning::{BacktestSummary, PerformanceSummary};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print prometheus counters after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the ticker universe and append to the prediction log
    Scan {
        /// Universe tickers to scan (default: SCAN_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Rows of the ranked log to print
        #[arg(short, long, default_value = "20")]
        top: usize,
    },
    /// Walk-forward backtest of one ticker
    Backtest {
        ticker: String,

        #[arg(long)]
        start_year: Option<i32>,

        #[arg(long)]
        end_year: Option<i32>,

        /// Training window in years
        #[arg(long)]
        train_window: Option<i32>,

        /// Test window in years
        #[arg(long)]
        test_window: Option<i32>,
    },
    /// Replay logged predictions against the stop/target rule
    Evaluate {
        /// Minimum age and holding period in days (default: EVAL_MAX_DAYS)
        #[arg(short, long)]
        max_days: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let ctx = ScannerContext::from_config(&config)?;
    let today = Local::now().date_naive();

    info!("stockscan {} (mode {:?})", env!("CARGO_PKG_VERSION"), config.provider.mode);

    match cli.command {
        Commands::Scan { limit, top } => {
            let limit = limit.unwrap_or(config.scan.limit);
            let report = ctx.scan_engine().scan(limit, today).await?;

            if report.is_empty() {
                println!("No ticker met the filters.");
            } else {
                println!(
                    "{} new predictions ({} skipped, {} failed). Top {}:",
                    report.new_predictions.len(),
                    report.skipped.len(),
                    report.failed.len(),
                    top
                );
                println!("{:<8} {:>10} {:>12} {:>12}", "Ticker", "Prob_5perc", "EntryPrice", "Date");
                for p in report.top(top) {
                    println!(
                        "{:<8} {:>10.4} {:>12} {:>12}",
                        p.ticker, p.probability, p.entry_price, p.date
                    );
                }
            }
            for (ticker, reason) in &report.failed {
                println!("  failed {}: {}", ticker, reason);
            }
        }
        Commands::Backtest {
            ticker,
            start_year,
            end_year,
            train_window,
            test_window,
        } => {
            let defaults = &config.backtest;
            let params = defaults.params().with_years(
                start_year.unwrap_or(defaults.start_year),
                end_year.unwrap_or(defaults.end_year),
                train_window.unwrap_or(defaults.train_years),
                test_window.unwrap_or(defaults.test_years),
            );
            let results = ctx.backtester().backtest(&ticker, &params).await?;

            println!("{:<6} {:>9} {:>10} {:>7} {:>7}", "Year", "HitRate", "Precision", "Train", "Test");
            for r in &results {
                println!(
                    "{:<6} {:>9.3} {:>10.3} {:>7} {:>7}",
                    r.year, r.hit_rate, r.precision, r.train_rows, r.test_rows
                );
            }
            match BacktestSummary::from_results(&results) {
                Some(s) => println!(
                    "{} windows: mean hit rate {:.3} (sd {:.3}), mean precision {:.3} (sd {:.3})",
                    s.windows,
                    s.mean_hit_rate,
                    s.hit_rate_std_dev,
                    s.mean_precision,
                    s.precision_std_dev
                ),
                None => println!("No window had enough data for {}.", ticker),
            }
        }
        Commands::Evaluate { max_days } => {
            let max_days = max_days.unwrap_or(config.evaluation.max_days);
            let records = ctx.evaluator().evaluate(max_days, today).await?;

            println!(
                "{:<12} {:<8} {:>10} {:>10} {:>9} {:<8}",
                "Date", "Ticker", "Entry", "Exit", "Return", "Outcome"
            );
            for r in &records {
                println!(
                    "{:<12} {:<8} {:>10} {:>10} {:>8.2}% {:<8}",
                    r.date,
                    r.ticker,
                    r.entry_price,
                    r.exit_price,
                    r.realized_return * 100.0,
                    r.outcome
                );
            }
            match PerformanceSummary::from_records(&records) {
                Some(s) => println!(
                    "{} evaluated: hit rate {:.1}%, average return {:.2}%, equity {:.4}",
                    s.evaluated,
                    s.hit_rate * 100.0,
                    s.average_return * 100.0,
                    s.final_equity()
                ),
                None => println!("No prediction is at least {} days old yet.", max_days),
            }
        }
    }

    if cli.metrics {
        print!("{}", ctx.metrics.render());
    }
    Ok(())
}
