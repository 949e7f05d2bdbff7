use crate::application::backtest::WalkForwardBacktester;
use crate::application::evaluation::{BarrierParams, OutcomeEvaluator};
use crate::application::features::{FeatureBuilder, FeaturePipeline};
use crate::application::scanner::{ScanEngine, ScanParams};
use crate::config::{Config, Mode};
use crate::domain::ml::ProbabilisticClassifier;
use crate::domain::ports::{MarketDataService, PredictionLog, TickerUniverse};
use crate::domain::sentiment::SentimentProvider;
use crate::infrastructure::observability::ScannerMetrics;
use crate::infrastructure::{
    AlpacaMarketDataService, CachedMarketDataService, CachedSentimentProvider, CsvPredictionLog,
    CsvTickerUniverse, NewsSentimentProvider, StaticSentimentProvider, StaticTickerUniverse,
    SyntheticMarketDataService,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const MOCK_SYMBOLS: &[&str] = &["AAPL", "MSFT", "NVDA", "AMZN", "GOOGL", "META", "JPM", "XOM"];

/// Everything a run needs, wired once from configuration.
///
/// Caches live here, so their lifetime is the context's, not the process's.
#[derive(Clone)]
pub struct ScannerContext {
    pub market: Arc<dyn MarketDataService>,
    pub sentiment: Arc<dyn SentimentProvider>,
    pub universe: Arc<dyn TickerUniverse>,
    pub log: Arc<dyn PredictionLog>,
    pub classifier: Arc<dyn ProbabilisticClassifier>,
    pub builder: FeatureBuilder,
    pub scan_params: ScanParams,
    pub barrier_params: BarrierParams,
    pub metrics: ScannerMetrics,
}

impl ScannerContext {
    pub fn from_config(config: &Config) -> Result<Self> {
        let metrics = ScannerMetrics::new()?;
        let ttl = Duration::from_secs(config.provider.cache_ttl_seconds);
        let provider = &config.provider;

        let (raw_market, raw_sentiment, default_universe): (
            Arc<dyn MarketDataService>,
            Arc<dyn SentimentProvider>,
            Arc<dyn TickerUniverse>,
        ) = match provider.mode {
            Mode::Mock => (
                Arc::new(SyntheticMarketDataService::default()),
                Arc::new(StaticSentimentProvider::new()),
                Arc::new(StaticTickerUniverse::new(MOCK_SYMBOLS.iter().copied())),
            ),
            Mode::Alpaca => (
                Arc::new(AlpacaMarketDataService::new(
                    provider.alpaca_api_key.clone(),
                    provider.alpaca_secret_key.clone(),
                    provider.alpaca_data_url.clone(),
                )),
                Arc::new(NewsSentimentProvider::new(&provider.news_rss_url_template)),
                Arc::new(CsvTickerUniverse::new(&provider.universe_url)),
            ),
        };

        let universe: Arc<dyn TickerUniverse> = if provider.symbols.is_empty() {
            default_universe
        } else {
            Arc::new(StaticTickerUniverse::new(provider.symbols.clone()))
        };

        let market: Arc<dyn MarketDataService> = Arc::new(
            CachedMarketDataService::new(raw_market, ttl).with_metrics(metrics.clone()),
        );
        let sentiment: Arc<dyn SentimentProvider> = Arc::new(
            CachedSentimentProvider::new(raw_sentiment, ttl).with_metrics(metrics.clone()),
        );

        info!(
            "ScannerContext: mode {:?}, log {}, cache TTL {}s",
            provider.mode,
            config.scan.prediction_log_path.display(),
            provider.cache_ttl_seconds
        );

        Ok(Self {
            market,
            sentiment,
            universe,
            log: Arc::new(CsvPredictionLog::new(config.scan.prediction_log_path.clone())),
            classifier: Arc::new(config.model.ensemble()),
            builder: FeatureBuilder::default(),
            scan_params: config.scan.params(),
            barrier_params: config.evaluation.barrier_params(),
            metrics,
        })
    }

    pub fn pipeline(&self) -> FeaturePipeline {
        FeaturePipeline::new(self.market.clone(), self.sentiment.clone(), self.builder)
    }

    pub fn scan_engine(&self) -> ScanEngine {
        ScanEngine::new(
            self.universe.clone(),
            Arc::new(self.pipeline()),
            self.classifier.clone(),
            self.log.clone(),
            self.scan_params,
        )
        .with_metrics(self.metrics.clone())
    }

    pub fn backtester(&self) -> WalkForwardBacktester {
        WalkForwardBacktester::new(
            self.market.clone(),
            self.sentiment.clone(),
            self.builder,
            self.classifier.clone(),
        )
        .with_metrics(self.metrics.clone())
    }

    pub fn evaluator(&self) -> OutcomeEvaluator {
        OutcomeEvaluator::new(self.market.clone(), self.log.clone(), self.barrier_params)
            .with_metrics(self.metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_mock_context_uses_static_universe() {
        let vars: HashMap<&str, &str> = HashMap::new();
        let config = Config::from_vars(&vars).unwrap();
        let ctx = ScannerContext::from_config(&config).unwrap();
        let symbols = ctx.universe.constituents().await.unwrap();
        assert_eq!(symbols.len(), MOCK_SYMBOLS.len());
        assert_eq!(ctx.sentiment.score("AAPL").await, 0.0);
    }

    #[tokio::test]
    async fn test_symbols_override_universe() {
        let vars: HashMap<&str, &str> = HashMap::from([("SYMBOLS", "tsla,amd")]);
        let config = Config::from_vars(&vars).unwrap();
        let ctx = ScannerContext::from_config(&config).unwrap();
        assert_eq!(ctx.universe.constituents().await.unwrap(), vec!["TSLA", "AMD"]);
    }
}
