// HTTP clients and caches
pub mod core;

// Market data providers
pub mod market_data;

// News sentiment providers
pub mod news;

// Prediction log storage
pub mod persistence;

// Ticker universe sources
pub mod universe;

// Prometheus counters
pub mod observability;

pub use market_data::{
    AlpacaMarketDataService, CachedMarketDataService, SyntheticMarketDataService,
};
pub use news::{CachedSentimentProvider, NewsSentimentProvider, StaticSentimentProvider};
pub use persistence::{CsvPredictionLog, InMemoryPredictionLog};
pub use universe::{CsvTickerUniverse, StaticTickerUniverse};
