use crate::domain::errors::ScanError;
use crate::domain::market::{Bar, DateRange};
use crate::domain::scanning::Prediction;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

// Need async_trait for async functions in traits
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Daily bars for `ticker` with dates inside `range`, chronological.
    /// An empty vector means the provider has nothing for that range.
    async fn get_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>>;

    /// Batched variant keyed by ticker. Tickers without data may be missing from the map.
    async fn get_daily_bars_batch(
        &self,
        tickers: &[String],
        range: DateRange,
    ) -> Result<HashMap<String, Vec<Bar>>> {
        let mut out = HashMap::with_capacity(tickers.len());
        for ticker in tickers {
            let bars = self.get_daily_bars(ticker, range).await?;
            if !bars.is_empty() {
                out.insert(ticker.clone(), bars);
            }
        }
        Ok(out)
    }
}

/// Source of the ticker symbols to scan.
#[async_trait]
pub trait TickerUniverse: Send + Sync {
    async fn constituents(&self) -> Result<Vec<String>>;
}

/// Append-only store of predictions.
#[async_trait]
pub trait PredictionLog: Send + Sync {
    /// Every logged prediction in insertion order. A log that was never written is empty.
    async fn load(&self) -> Result<Vec<Prediction>, ScanError>;

    /// Appends `predictions` after the existing entries and returns the merged log.
    async fn append(&self, predictions: &[Prediction]) -> Result<Vec<Prediction>, ScanError>;
}
