pub mod cached;
pub mod rss;
pub mod sentiment_analyzer;

pub use cached::{CachedSentimentProvider, StaticSentimentProvider};
pub use rss::NewsSentimentProvider;
pub use sentiment_analyzer::SentimentAnalyzer;
