use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stockscan::application::evaluation::{BarrierParams, OutcomeEvaluator};
use stockscan::domain::errors::ScanError;
use stockscan::domain::market::{Bar, DateRange};
use stockscan::domain::ports::{MarketDataService, PredictionLog};
use stockscan::domain::scanning::{Outcome, PerformanceSummary, Prediction};
use stockscan::infrastructure::persistence::InMemoryPredictionLog;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn bar(date: NaiveDate, low: Decimal, high: Decimal, close: Decimal) -> Bar {
    Bar::new(date, close, high, low, close, dec!(1000))
}

/// Consecutive sessions from the day after `start`, one per (low, high, close).
fn path(start: NaiveDate, legs: &[(Decimal, Decimal, Decimal)]) -> Vec<Bar> {
    legs.iter()
        .enumerate()
        .map(|(i, &(low, high, close))| bar(start + Duration::days(i as i64 + 1), low, high, close))
        .collect()
}

// --- Recording market data ---
#[derive(Default)]
struct RecordingMarket {
    series: HashMap<String, Vec<Bar>>,
    requests: Mutex<Vec<(String, DateRange)>>,
}

impl RecordingMarket {
    fn with_series(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.series.insert(ticker.to_string(), bars);
        self
    }
}

#[async_trait]
impl MarketDataService for RecordingMarket {
    async fn get_daily_bars(&self, ticker: &str, range: DateRange) -> anyhow::Result<Vec<Bar>> {
        self.requests
            .lock()
            .unwrap()
            .push((ticker.to_string(), range));
        Ok(self
            .series
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| range.contains(b.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn fixture() -> (Arc<RecordingMarket>, Arc<InMemoryPredictionLog>) {
    let day = d("2024-03-01");
    let market = RecordingMarket::default()
        .with_series(
            "HOLD",
            path(
                day,
                &[
                    (dec!(99), dec!(101), dec!(100)),
                    (dec!(99), dec!(103), dec!(101)),
                    (dec!(100), dec!(104), dec!(102)),
                ],
            ),
        )
        .with_series(
            "HIT",
            path(
                day,
                &[
                    (dec!(99), dec!(101), dec!(100)),
                    (dec!(101), dec!(106), dec!(104)),
                    (dec!(90), dec!(95), dec!(92)),
                ],
            ),
        )
        .with_series(
            "STOP",
            path(
                day,
                &[
                    (dec!(96), dec!(100), dec!(98)),
                    (dec!(99), dec!(110), dec!(109)),
                ],
            ),
        )
        .with_series(
            "BOTH",
            path(day, &[(dec!(96), dec!(106), dec!(101))]),
        );

    let log = InMemoryPredictionLog::with_entries(vec![
        Prediction::new("HOLD", day, 0.71, dec!(100)),
        Prediction::new("HIT", day, 0.64, dec!(100)),
        Prediction::new("STOP", day, 0.58, dec!(100)),
        Prediction::new("BOTH", day, 0.55, dec!(100)),
        Prediction::new("NOBARS", day, 0.52, dec!(100)),
        Prediction::new("HIT", d("2024-03-12"), 0.90, dec!(100)),
    ]);
    (Arc::new(market), Arc::new(log))
}

#[tokio::test]
async fn test_barrier_outcomes_for_matured_predictions() {
    let (market, log) = fixture();
    let evaluator = OutcomeEvaluator::new(market.clone(), log, BarrierParams::default());

    let records = evaluator.evaluate(7, d("2024-03-15")).await.unwrap();

    // NOBARS is skipped, the 2024-03-12 prediction is too young.
    let tickers: Vec<&str> = records.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["HOLD", "HIT", "STOP", "BOTH"]);

    let hold = &records[0];
    assert_eq!(hold.outcome, Outcome::Hold);
    assert!((hold.realized_return - 0.02).abs() < 1e-12);
    assert_eq!(hold.future_price, dec!(102));
    assert!(!hold.hit);

    let hit = &records[1];
    assert_eq!(hit.outcome, Outcome::Hit);
    assert!((hit.realized_return - 0.04).abs() < 1e-12);
    assert_eq!(hit.exit_price, dec!(104));
    assert_eq!(hit.future_price, dec!(92));
    assert!(hit.hit);

    let stop = &records[2];
    assert_eq!(stop.outcome, Outcome::Stopped);
    assert!((stop.realized_return + 0.03).abs() < 1e-12);
    assert_eq!(stop.exit_price, dec!(97));
    assert!(!stop.hit);

    assert_eq!(records[3].outcome, Outcome::Stopped);
}

#[tokio::test]
async fn test_fetch_window_covers_holding_period_plus_slack() {
    let (market, log) = fixture();
    let evaluator = OutcomeEvaluator::new(market.clone(), log, BarrierParams::default());

    evaluator.evaluate(7, d("2024-03-15")).await.unwrap();

    let requests = market.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 5);
    let (ticker, range) = &requests[0];
    assert_eq!(ticker, "HOLD");
    assert_eq!(*range, DateRange::new(d("2024-03-01"), d("2024-03-13")));
}

#[tokio::test]
async fn test_evaluation_is_repeatable_and_read_only() {
    let (market, log) = fixture();
    let before = log.load().await.unwrap();
    let evaluator = OutcomeEvaluator::new(market, log.clone(), BarrierParams::default());

    let first = evaluator.evaluate(7, d("2024-03-15")).await.unwrap();
    let second = evaluator.evaluate(7, d("2024-03-15")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(log.load().await.unwrap(), before);
}

#[tokio::test]
async fn test_zero_max_days_includes_todays_predictions() {
    let (market, log) = fixture();
    let evaluator = OutcomeEvaluator::new(market, log, BarrierParams::default());

    // The 2024-03-12 HIT prediction has no bars after its date.
    let records = evaluator.evaluate(0, d("2024-03-12")).await.unwrap();

    assert_eq!(records.len(), 4);
}

#[tokio::test]
async fn test_negative_max_days_is_rejected() {
    let (market, log) = fixture();
    let evaluator = OutcomeEvaluator::new(market, log, BarrierParams::default());

    let err = evaluator.evaluate(-1, d("2024-03-15")).await.unwrap_err();

    assert!(matches!(err, ScanError::InvalidParameters { .. }));
}

#[tokio::test]
async fn test_summary_over_evaluated_records() {
    let (market, log) = fixture();
    let evaluator = OutcomeEvaluator::new(market, log, BarrierParams::default());

    let records = evaluator.evaluate(7, d("2024-03-15")).await.unwrap();
    let summary = PerformanceSummary::from_records(&records).unwrap();

    assert_eq!(summary.evaluated, 4);
    assert!((summary.hit_rate - 0.25).abs() < 1e-12);
    assert!((summary.average_return - 0.0).abs() < 1e-12);
}
