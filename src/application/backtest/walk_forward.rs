use crate::application::features::FeatureBuilder;
use crate::domain::errors::ScanError;
use crate::domain::market::Bar;
use crate::domain::ml::feature_registry::positive_count;
use crate::domain::ml::{ClassifierError, FeatureRow, FeatureSet, ProbabilisticClassifier};
use crate::domain::ports::MarketDataService;
use crate::domain::scanning::{BacktestWindowResult, WalkForwardParams, WalkForwardWindow};
use crate::domain::sentiment::SentimentProvider;
use crate::infrastructure::observability::ScannerMetrics;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hit rate, precision and predicted-positive count of binarized probabilities.
///
/// Precision divides by `max(predicted_positives, 1)`, so no positive predictions give 0.
pub fn score_predictions(probabilities: &[f64], labels: &[bool], threshold: f64) -> (f64, f64, usize) {
    if labels.is_empty() {
        return (0.0, 0.0, 0);
    }
    let mut correct = 0usize;
    let mut true_positives = 0usize;
    let mut predicted_positives = 0usize;
    for (p, &label) in probabilities.iter().zip(labels) {
        let predicted = *p > threshold;
        if predicted == label {
            correct += 1;
        }
        if predicted {
            predicted_positives += 1;
            if label {
                true_positives += 1;
            }
        }
    }
    let hit_rate = correct as f64 / labels.len() as f64;
    let precision = true_positives as f64 / predicted_positives.max(1) as f64;
    (hit_rate, precision, predicted_positives)
}

/// Train rows fall before `window.test.start`, test rows inside `window.test`.
pub fn partition_rows<'a>(
    rows: &'a [FeatureRow],
    window: &WalkForwardWindow,
) -> (Vec<&'a FeatureRow>, Vec<&'a FeatureRow>) {
    let train = rows
        .iter()
        .filter(|r| window.train.contains(r.date))
        .collect();
    let test = rows.iter().filter(|r| window.test.contains(r.date)).collect();
    (train, test)
}

/// Trains a fresh model for one window and scores it out of sample.
///
/// `bars` may cover more than the window; only bars inside `window.span()` are used.
pub fn evaluate_window(
    ticker: &str,
    bars: &[Bar],
    sentiment: f64,
    window: &WalkForwardWindow,
    params: &WalkForwardParams,
    builder: &FeatureBuilder,
    classifier: &dyn ProbabilisticClassifier,
) -> Result<BacktestWindowResult, ScanError> {
    let span = window.span();
    let window_bars: Vec<Bar> = bars
        .iter()
        .filter(|b| span.contains(b.date))
        .cloned()
        .collect();
    if window_bars.is_empty() {
        return Err(ScanError::data_unavailable(ticker, format!("no bars in {}", span)));
    }

    let set: FeatureSet = builder.build(ticker, &window_bars, sentiment)?;
    if set.len() < params.min_rows {
        return Err(ScanError::insufficient_signal(
            ticker,
            format!("{} feature rows < {}", set.len(), params.min_rows),
        ));
    }

    let (train, test) = partition_rows(&set.rows, window);
    let train_labels: Vec<bool> = train.iter().map(|r| r.label.unwrap_or(false)).collect();
    let positives = positive_count(&train_labels);
    if positives < params.min_positive_labels || test.len() < params.min_test_rows {
        return Err(ScanError::insufficient_signal(
            ticker,
            format!(
                "{} positive train labels (min {}), {} test rows (min {})",
                positives,
                params.min_positive_labels,
                test.len(),
                params.min_test_rows
            ),
        ));
    }

    let train_features: Vec<_> = train.iter().map(|r| r.features).collect();
    let test_features: Vec<_> = test.iter().map(|r| r.features).collect();
    let test_labels: Vec<bool> = test.iter().map(|r| r.label.unwrap_or(false)).collect();

    let to_model_error = |source: ClassifierError| ScanError::Model {
        ticker: ticker.to_string(),
        source,
    };
    let model = classifier
        .fit(&train_features, &train_labels)
        .map_err(to_model_error)?;
    let probabilities = model
        .predict_probability(&test_features)
        .map_err(to_model_error)?;

    let (hit_rate, precision, predicted_positives) =
        score_predictions(&probabilities, &test_labels, params.probability_threshold);

    Ok(BacktestWindowResult {
        year: window.origin_year,
        hit_rate,
        precision,
        train_rows: train.len(),
        test_rows: test.len(),
        predicted_positives,
    })
}

/// Walk-forward evaluation of the classifier on one ticker's history.
pub struct WalkForwardBacktester {
    market: Arc<dyn MarketDataService>,
    sentiment: Arc<dyn SentimentProvider>,
    builder: FeatureBuilder,
    classifier: Arc<dyn ProbabilisticClassifier>,
    metrics: Option<ScannerMetrics>,
}

impl WalkForwardBacktester {
    pub fn new(
        market: Arc<dyn MarketDataService>,
        sentiment: Arc<dyn SentimentProvider>,
        builder: FeatureBuilder,
        classifier: Arc<dyn ProbabilisticClassifier>,
    ) -> Self {
        Self {
            market,
            sentiment,
            builder,
            classifier,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ScannerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One result per non-skipped origin year, in year order.
    ///
    /// Only invalid parameters are an error. Missing data or a failed fetch yields an empty
    /// result, as does a history where every window is skipped.
    pub async fn backtest(
        &self,
        ticker: &str,
        params: &WalkForwardParams,
    ) -> Result<Vec<BacktestWindowResult>, ScanError> {
        params
            .validate()
            .map_err(|reason| ScanError::InvalidParameters { reason })?;

        let windows = params.windows();
        let Some(span) = params.span() else {
            info!(
                "WalkForwardBacktester: no windows for {} between {} and {}",
                ticker, params.start_year, params.end_year
            );
            return Ok(Vec::new());
        };

        let bars = match self.market.get_daily_bars(ticker, span).await {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => {
                warn!("WalkForwardBacktester: no bars for {} in {}", ticker, span);
                self.count_windows("data_unavailable", windows.len());
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(
                    "WalkForwardBacktester: bar fetch failed for {}: {:#}",
                    ticker, e
                );
                self.count_windows("provider_failure", windows.len());
                return Ok(Vec::new());
            }
        };
        let sentiment = self.sentiment.score(ticker).await;

        info!(
            "WalkForwardBacktester: {} windows for {} over {} ({} bars)",
            windows.len(),
            ticker,
            span,
            bars.len()
        );

        let ticker_owned = ticker.to_string();
        let builder = self.builder;
        let classifier = self.classifier.clone();
        let params_owned = *params;

        // Windows are independent; rayon keeps the output in year order.
        let outcomes = tokio::task::spawn_blocking(move || {
            windows
                .par_iter()
                .map(|window| {
                    let outcome = evaluate_window(
                        &ticker_owned,
                        &bars,
                        sentiment,
                        window,
                        &params_owned,
                        &builder,
                        classifier.as_ref(),
                    );
                    (window.origin_year, outcome)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ScanError::WorkerFailed {
            reason: e.to_string(),
        })?;

        let mut results = Vec::with_capacity(outcomes.len());
        for (year, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    debug!(
                        "WalkForwardBacktester: {} {} hit rate {:.3}, precision {:.3}",
                        ticker, year, result.hit_rate, result.precision
                    );
                    self.count_windows("evaluated", 1);
                    results.push(result);
                }
                Err(e) => {
                    debug!("WalkForwardBacktester: skipping {} {}: {}", ticker, year, e);
                    self.count_windows(e.kind(), 1);
                }
            }
        }
        Ok(results)
    }

    fn count_windows(&self, result: &str, n: usize) {
        if let Some(m) = &self.metrics {
            for _ in 0..n {
                m.inc_window(result);
            }
        }
    }
}
