use crate::application::features::FeaturePipeline;
use crate::domain::errors::ScanError;
use crate::domain::market::DateRange;
use crate::domain::ml::feature_registry::positive_count;
use crate::domain::ml::{ClassifierError, ProbabilisticClassifier};
use crate::domain::ports::{PredictionLog, TickerUniverse};
use crate::domain::scanning::Prediction;
use crate::domain::scanning::prediction::rank_by_probability;
use crate::infrastructure::observability::ScannerMetrics;
use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    /// Calendar days of history ending on the run date.
    pub lookback_days: i64,
    /// Most recent labeled rows held out of training.
    pub holdout_rows: usize,
    pub min_positive_labels: usize,
    /// Tickers in flight at once; 1 scans sequentially.
    pub concurrency: usize,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            lookback_days: 5 * 365,
            holdout_rows: 20,
            min_positive_labels: 5,
            concurrency: 4,
        }
    }
}

/// What happened to one ticker during a scan.
#[derive(Debug)]
pub enum TickerResult {
    Predicted(Prediction),
    /// Not enough data or signal; expected and silent.
    Skipped { ticker: String, error: ScanError },
    /// Provider or model error, contained to this ticker.
    Failed { ticker: String, error: ScanError },
}

impl TickerResult {
    fn from_outcome(ticker: &str, outcome: Result<Prediction, ScanError>) -> Self {
        match outcome {
            Ok(p) => TickerResult::Predicted(p),
            Err(
                error @ (ScanError::DataUnavailable { .. } | ScanError::InsufficientSignal { .. }),
            ) => TickerResult::Skipped {
                ticker: ticker.to_string(),
                error,
            },
            Err(error) => TickerResult::Failed {
                ticker: ticker.to_string(),
                error,
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TickerResult::Predicted(_) => "predicted",
            TickerResult::Skipped { .. } => "skipped",
            TickerResult::Failed { .. } => "failed",
        }
    }
}

/// Output of one scan run.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Whole log after this run's append, highest probability first.
    pub ranked: Vec<Prediction>,
    /// Predictions produced by this run, in universe order.
    pub new_predictions: Vec<Prediction>,
    pub skipped: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

impl ScanReport {
    /// First `n` ranked predictions.
    pub fn top(&self, n: usize) -> &[Prediction] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

pub struct ScanEngine {
    universe: Arc<dyn TickerUniverse>,
    pipeline: Arc<FeaturePipeline>,
    classifier: Arc<dyn ProbabilisticClassifier>,
    log: Arc<dyn PredictionLog>,
    params: ScanParams,
    metrics: Option<ScannerMetrics>,
}

impl ScanEngine {
    pub fn new(
        universe: Arc<dyn TickerUniverse>,
        pipeline: Arc<FeaturePipeline>,
        classifier: Arc<dyn ProbabilisticClassifier>,
        log: Arc<dyn PredictionLog>,
        params: ScanParams,
    ) -> Self {
        Self {
            universe,
            pipeline,
            classifier,
            log,
            params,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ScannerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Scans the first `limit` universe tickers as of `today`.
    ///
    /// Per-ticker failures are contained. When at least one ticker is predicted the log is
    /// appended to and the merged log is returned ranked; otherwise the log is left untouched
    /// and the report is empty. Universe and log failures abort the run.
    pub async fn scan(&self, limit: usize, today: NaiveDate) -> Result<ScanReport, ScanError> {
        let mut tickers = self
            .universe
            .constituents()
            .await
            .map_err(|e| ScanError::UniverseUnavailable {
                reason: format!("{:#}", e),
            })?;
        tickers.truncate(limit);

        info!(
            "ScanEngine: scanning {} tickers as of {} (concurrency {})",
            tickers.len(),
            today,
            self.params.concurrency
        );

        let results: Vec<TickerResult> = stream::iter(tickers)
            .map(|ticker| async move {
                let outcome = self.scan_ticker(&ticker, today).await;
                TickerResult::from_outcome(&ticker, outcome)
            })
            .buffered(self.params.concurrency.max(1))
            .collect()
            .await;

        let mut report = ScanReport::default();
        for result in results {
            if let Some(m) = &self.metrics {
                m.inc_ticker(result.label());
            }
            match result {
                TickerResult::Predicted(p) => report.new_predictions.push(p),
                TickerResult::Skipped { ticker, error } => {
                    debug!("ScanEngine: skipped {}: {}", ticker, error);
                    report.skipped.push((ticker, error.to_string()));
                }
                TickerResult::Failed { ticker, error } => {
                    warn!("ScanEngine: {} failed: {}", ticker, error);
                    report.failed.push((ticker, error.to_string()));
                }
            }
        }

        if report.new_predictions.is_empty() {
            info!(
                "ScanEngine: no ticker passed the filters ({} skipped, {} failed)",
                report.skipped.len(),
                report.failed.len()
            );
            return Ok(report);
        }

        let mut merged = self.log.append(&report.new_predictions).await?;
        rank_by_probability(&mut merged);
        report.ranked = merged;

        info!(
            "ScanEngine: {} new predictions ({} skipped, {} failed), log holds {}",
            report.new_predictions.len(),
            report.skipped.len(),
            report.failed.len(),
            report.ranked.len()
        );
        Ok(report)
    }

    /// Trains on everything but the holdout tail and scores the most recent row.
    pub async fn scan_ticker(&self, ticker: &str, today: NaiveDate) -> Result<Prediction, ScanError> {
        let range = DateRange::inclusive(today - Duration::days(self.params.lookback_days), today);
        let bars = self.pipeline.fetch_bars(ticker, range).await?;
        let sentiment = self.pipeline.sentiment(ticker).await;
        let set = self.pipeline.builder().build(ticker, &bars, sentiment)?;

        let train_len = set.len().saturating_sub(self.params.holdout_rows);
        let train_rows = &set.rows[..train_len];
        let labels: Vec<bool> = train_rows.iter().map(|r| r.label.unwrap_or(false)).collect();
        let positives = positive_count(&labels);
        if positives < self.params.min_positive_labels {
            return Err(ScanError::insufficient_signal(
                ticker,
                format!(
                    "{} positive labels in {} training rows (min {})",
                    positives,
                    train_len,
                    self.params.min_positive_labels
                ),
            ));
        }

        let latest = set
            .latest()
            .ok_or_else(|| ScanError::data_unavailable(ticker, "no scorable row"))?
            .features;
        let entry_price = bars
            .last()
            .map(|b| b.close)
            .ok_or_else(|| ScanError::data_unavailable(ticker, "no closing price"))?;

        let features: Vec<_> = train_rows.iter().map(|r| r.features).collect();
        let classifier = self.classifier.clone();
        let trained = tokio::task::spawn_blocking(move || -> Result<f64, ClassifierError> {
            let model = classifier.fit(&features, &labels)?;
            let probs = model.predict_probability(&[latest])?;
            Ok(probs.first().copied().unwrap_or(0.0))
        })
        .await
        .map_err(|e| ScanError::WorkerFailed {
            reason: e.to_string(),
        })?;
        let probability = trained.map_err(|source| ScanError::Model {
            ticker: ticker.to_string(),
            source,
        })?;

        debug!(
            "ScanEngine: {} p={:.3} entry={} ({} training rows, {} positives)",
            ticker, probability, entry_price, train_len, positives
        );
        Ok(Prediction::new(ticker, today, probability, entry_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pred(ticker: &str, p: f64) -> Prediction {
        Prediction::new(
            ticker,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            p,
            dec!(10),
        )
    }

    #[test]
    fn test_report_top_truncates() {
        let report = ScanReport {
            ranked: vec![pred("A", 0.9), pred("B", 0.5), pred("C", 0.1)],
            ..ScanReport::default()
        };
        assert_eq!(report.top(2).len(), 2);
        assert_eq!(report.top(10).len(), 3);
        assert_eq!(report.top(0).len(), 0);
    }

    #[test]
    fn test_ticker_result_classification() {
        let skipped = TickerResult::from_outcome(
            "A",
            Err(ScanError::insufficient_signal("A", "3 positives")),
        );
        assert_eq!(skipped.label(), "skipped");

        let failed = TickerResult::from_outcome(
            "B",
            Err(ScanError::ProviderFailure {
                provider: "market data".to_string(),
                ticker: "B".to_string(),
                reason: "timeout".to_string(),
            }),
        );
        assert_eq!(failed.label(), "failed");

        let ok = TickerResult::from_outcome("C", Ok(pred("C", 0.4)));
        assert_eq!(ok.label(), "predicted");
    }
}
