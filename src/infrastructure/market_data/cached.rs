use crate::domain::market::{Bar, DateRange};
use crate::domain::ports::MarketDataService;
use crate::infrastructure::core::TtlCache;
use crate::infrastructure::observability::ScannerMetrics;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

type BarsKey = (String, DateRange);

/// TTL memoization in front of another market data service, keyed by (ticker, range).
/// Batched requests read and fill the same per-ticker entries. Errors are not cached.
pub struct CachedMarketDataService {
    inner: Arc<dyn MarketDataService>,
    cache: TtlCache<BarsKey, Arc<Vec<Bar>>>,
    metrics: Option<ScannerMetrics>,
}

impl CachedMarketDataService {
    pub fn new(inner: Arc<dyn MarketDataService>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ScannerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record(&self, hit: bool) {
        if let Some(m) = &self.metrics {
            m.inc_cache("bars", hit);
        }
    }
}

#[async_trait]
impl MarketDataService for CachedMarketDataService {
    async fn get_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>> {
        let key = (ticker.to_string(), range);
        if let Some(bars) = self.cache.get(&key).await {
            trace!("CachedMarketDataService: hit for {} {}", ticker, range);
            self.record(true);
            return Ok(bars.as_ref().clone());
        }
        self.record(false);
        let bars = self.inner.get_daily_bars(ticker, range).await?;
        self.cache.insert(key, Arc::new(bars.clone())).await;
        Ok(bars)
    }

    /// Serves cached tickers and fetches only the misses, in one inner batch call.
    async fn get_daily_bars_batch(
        &self,
        tickers: &[String],
        range: DateRange,
    ) -> Result<HashMap<String, Vec<Bar>>> {
        let mut out = HashMap::with_capacity(tickers.len());
        let mut missing = Vec::new();
        for ticker in tickers {
            let cached = self.cache.get(&(ticker.clone(), range)).await;
            self.record(cached.is_some());
            match cached {
                Some(bars) if bars.is_empty() => {}
                Some(bars) => {
                    out.insert(ticker.clone(), bars.as_ref().clone());
                }
                None => missing.push(ticker.clone()),
            }
        }
        if missing.is_empty() {
            return Ok(out);
        }

        let mut fetched = self.inner.get_daily_bars_batch(&missing, range).await?;
        trace!(
            "CachedMarketDataService: batch fetched {}/{} tickers for {}",
            fetched.len(),
            missing.len(),
            range
        );
        for ticker in missing {
            // Absent from a successful batch means no data, which is cached like an empty fetch.
            let bars = fetched.remove(&ticker).unwrap_or_default();
            self.cache
                .insert((ticker.clone(), range), Arc::new(bars.clone()))
                .await;
            if !bars.is_empty() {
                out.insert(ticker, bars);
            }
        }
        Ok(out)
    }
}
