use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use stockscan::domain::errors::ScanError;
use stockscan::domain::ports::PredictionLog;
use stockscan::domain::scanning::Prediction;
use stockscan::infrastructure::persistence::CsvPredictionLog;
use tempfile::tempdir;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_single_row_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("predictions.csv");
    let prediction = Prediction::new("NVDA", d("2024-07-01"), 0.8125, dec!(123.45));

    CsvPredictionLog::new(&path)
        .append(std::slice::from_ref(&prediction))
        .await
        .unwrap();

    // A fresh handle sees exactly what was written.
    let reopened = CsvPredictionLog::new(&path);
    assert_eq!(reopened.load().await.unwrap(), vec![prediction]);

    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Ticker,Prob_5perc,EntryPrice,Date"));
    assert_eq!(lines.next(), Some("NVDA,0.8125,123.45,2024-07-01"));
    assert!(!dir.path().join("predictions.csv.lock").exists());
}

#[tokio::test]
async fn test_hand_written_log_with_timestamps_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.csv");
    fs::write(
        &path,
        "Ticker,Prob_5perc,EntryPrice,Date\n\
         AAPL,0.61,189.2,2024-01-05 00:00:00\n\
         MSFT,0.4,371.5,2024-01-08\n",
    )
    .unwrap();

    let log = CsvPredictionLog::new(&path);
    let loaded = log.load().await.unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].date, d("2024-01-05"));
    assert_eq!(loaded[0].entry_price, dec!(189.2));
    assert_eq!(loaded[1].ticker, "MSFT");

    let merged = log
        .append(&[Prediction::new("AMZN", d("2024-01-09"), 0.5, dec!(150))])
        .await
        .unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged[2].ticker, "AMZN");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_lose_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.csv");

    let mut handles = Vec::new();
    for writer in 0..4 {
        // Separate handles only share the on-disk lock file.
        let log = Arc::new(CsvPredictionLog::new(&path));
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                let ticker = format!("W{}_{}", writer, i);
                log.append(&[Prediction::new(ticker, d("2024-02-01"), 0.5, dec!(10))])
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let loaded = CsvPredictionLog::new(&path).load().await.unwrap();
    assert_eq!(loaded.len(), 20);
    for writer in 0..4 {
        let mine: Vec<&str> = loaded
            .iter()
            .map(|p| p.ticker.as_str())
            .filter(|t| t.starts_with(&format!("W{}_", writer)))
            .collect();
        let expected: Vec<String> = (0..5).map(|i| format!("W{}_{}", writer, i)).collect();
        assert_eq!(mine, expected);
    }
}

#[tokio::test]
async fn test_held_lock_times_out_without_touching_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("held.csv");
    let log = CsvPredictionLog::new(&path).with_lock_timeout(Duration::from_millis(120));
    log.append(&[Prediction::new("KEEP", d("2024-02-01"), 0.3, dec!(5))])
        .await
        .unwrap();
    fs::write(dir.path().join("held.csv.lock"), "").unwrap();

    let err = log
        .append(&[Prediction::new("LOST", d("2024-02-02"), 0.9, dec!(6))])
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::PersistenceFailure { .. }));
    let loaded = log.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].ticker, "KEEP");
}
