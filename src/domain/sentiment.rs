use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores above this are bullish, below its negation bearish.
pub const SENTIMENT_LABEL_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Bearish,
    Neutral,
    Bullish,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearish => write!(f, "Bearish"),
            Self::Neutral => write!(f, "Neutral"),
            Self::Bullish => write!(f, "Bullish"),
        }
    }
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > SENTIMENT_LABEL_THRESHOLD {
            Self::Bullish
        } else if score < -SENTIMENT_LABEL_THRESHOLD {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    /// +1 / 0 / -1, the vote a single headline contributes to a ticker score.
    pub fn vote(&self) -> f64 {
        match self {
            Self::Bearish => -1.0,
            Self::Neutral => 0.0,
            Self::Bullish => 1.0,
        }
    }
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Scalar news sentiment for `ticker` in `[-1, 1]`.
    ///
    /// Infallible: implementations return 0.0 (neutral) on any failure.
    async fn score(&self, ticker: &str) -> f64;

    /// Like [`score`](Self::score), but surfaces the failure instead of scoring neutral.
    /// Providers that can fail override this; the default never fails.
    async fn try_score(&self, ticker: &str) -> anyhow::Result<f64> {
        Ok(self.score(ticker).await)
    }
}
