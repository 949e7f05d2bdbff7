use crate::domain::sentiment::SentimentProvider;
use crate::infrastructure::core::TtlCache;
use crate::infrastructure::observability::ScannerMetrics;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Sentiment memoized per ticker for the cache TTL. Failed lookups are not cached.
pub struct CachedSentimentProvider {
    inner: Arc<dyn SentimentProvider>,
    cache: TtlCache<String, f64>,
    metrics: Option<ScannerMetrics>,
}

impl CachedSentimentProvider {
    pub fn new(inner: Arc<dyn SentimentProvider>, ttl: Duration) -> Self {
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
}

#[async_trait]
impl SentimentProvider for CachedSentimentProvider {
    async fn score(&self, ticker: &str) -> f64 {
        self.try_score(ticker).await.unwrap_or_else(|e| {
            warn!("CachedSentimentProvider: {} -> neutral: {:#}", ticker, e);
            0.0
        })
    }

    async fn try_score(&self, ticker: &str) -> Result<f64> {
        let key = ticker.to_string();
        let cached = self.cache.get(&key).await;
        if let Some(m) = &self.metrics {
            m.inc_cache("sentiment", cached.is_some());
        }
        if let Some(score) = cached {
            return Ok(score);
        }
        let score = self.inner.try_score(ticker).await?;
        self.cache.insert(key, score).await;
        Ok(score)
    }
}

/// Fixed scores per ticker, neutral for anything else.
#[derive(Debug, Clone, Default)]
pub struct StaticSentimentProvider {
    scores: HashMap<String, f64>,
}

impl StaticSentimentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, ticker: &str, score: f64) -> Self {
        self.scores.insert(ticker.to_string(), score.clamp(-1.0, 1.0));
        self
    }
}

#[async_trait]
impl SentimentProvider for StaticSentimentProvider {
    async fn score(&self, ticker: &str) -> f64 {
        self.scores.get(ticker).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl SentimentProvider for Counting {
        async fn score(&self, _ticker: &str) -> f64 {
            self.0.fetch_add(1, Ordering::SeqCst);
            0.6
        }
    }

    #[tokio::test]
    async fn test_score_is_cached_per_ticker() {
        let inner = Arc::new(Counting(AtomicUsize::new(0)));
        let cached = CachedSentimentProvider::new(inner.clone(), Duration::from_secs(300));

        assert_eq!(cached.score("AAPL").await, 0.6);
        assert_eq!(cached.score("AAPL").await, 0.6);
        assert_eq!(cached.score("MSFT").await, 0.6);
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);
    }

    /// Fails on its first call, then scores 0.8.
    struct FlakyFeed(AtomicUsize);

    #[async_trait]
    impl SentimentProvider for FlakyFeed {
        async fn score(&self, ticker: &str) -> f64 {
            self.try_score(ticker).await.unwrap_or(0.0)
        }

        async fn try_score(&self, _ticker: &str) -> Result<f64> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("feed timed out");
            }
            Ok(0.8)
        }
    }

    #[tokio::test]
    async fn test_failed_lookup_is_not_cached() {
        let inner = Arc::new(FlakyFeed(AtomicUsize::new(0)));
        let cached = CachedSentimentProvider::new(inner.clone(), Duration::from_secs(300));

        assert_eq!(cached.score("NVDA").await, 0.0);
        assert_eq!(cached.score("NVDA").await, 0.8);
        assert_eq!(cached.score("NVDA").await, 0.8);
        assert_eq!(inner.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_static_provider_defaults_to_neutral() {
        let provider = StaticSentimentProvider::new().with_score("AAPL", 1.7);
        assert_eq!(provider.score("AAPL").await, 1.0);
        assert_eq!(provider.score("ZZZ").await, 0.0);
    }
}
