//! Prometheus counters for scan, backtest and evaluation runs.
//!
//! All metrics use the `stockscan_` prefix. The CLI prints `render()` on `--metrics`.

use prometheus::{CounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct ScannerMetrics {
    registry: Arc<Registry>,
    /// Tickers processed by the scan engine, by result
    pub tickers_total: CounterVec,
    /// Walk-forward windows, by result
    pub backtest_windows_total: CounterVec,
    /// Evaluated predictions, by outcome
    pub outcomes_total: CounterVec,
    /// TTL cache lookups, by cache and hit/miss
    pub cache_requests_total: CounterVec,
}

impl ScannerMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tickers_total = CounterVec::new(
            Opts::new(
                "stockscan_tickers_total",
                "Tickers processed by the scan engine",
            ),
            &["result"],
        )?;
        registry.register(Box::new(tickers_total.clone()))?;

        let backtest_windows_total = CounterVec::new(
            Opts::new(
                "stockscan_backtest_windows_total",
                "Walk-forward windows evaluated or skipped",
            ),
            &["result"],
        )?;
        registry.register(Box::new(backtest_windows_total.clone()))?;

        let outcomes_total = CounterVec::new(
            Opts::new(
                "stockscan_outcomes_total",
                "Logged predictions evaluated, by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(outcomes_total.clone()))?;

        let cache_requests_total = CounterVec::new(
            Opts::new("stockscan_cache_requests_total", "TTL cache lookups"),
            &["cache", "result"],
        )?;
        registry.register(Box::new(cache_requests_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            tickers_total,
            backtest_windows_total,
            outcomes_total,
            cache_requests_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_ticker(&self, result: &str) {
        self.tickers_total.with_label_values(&[result]).inc();
    }

    pub fn inc_window(&self, result: &str) {
        self.backtest_windows_total
            .with_label_values(&[result])
            .inc();
    }

    pub fn inc_outcome(&self, outcome: &str) {
        self.outcomes_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_cache(&self, cache: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_requests_total
            .with_label_values(&[cache, result])
            .inc();
    }

    /// Current value of one labeled counter; 0 when never incremented.
    pub fn counter_value(&self, counter: &CounterVec, labels: &[&str]) -> f64 {
        counter
            .get_metric_with_label_values(labels)
            .map(|c| c.get())
            .unwrap_or(0.0)
    }
}
