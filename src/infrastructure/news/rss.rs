use crate::domain::sentiment::SentimentProvider;
use crate::infrastructure::core::HttpClientFactory;
use crate::infrastructure::news::sentiment_analyzer::SentimentAnalyzer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rss::Channel;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use url::form_urlencoded::byte_serialize;

pub const DEFAULT_RSS_URL_TEMPLATE: &str =
    "https://feeds.finance.yahoo.com/rss/2.0/headline?s={ticker}&region=US&lang=en-US";

/// Item titles of an RSS document, in feed order.
pub fn parse_headlines(bytes: &[u8]) -> Result<Vec<String>> {
    let channel = Channel::read_from(Cursor::new(bytes)).context("Failed to parse RSS feed")?;
    Ok(channel
        .items()
        .iter()
        .filter_map(|item| item.title())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

/// Scores a ticker from its news feed headlines. Any failure scores neutral.
pub struct NewsSentimentProvider {
    url_template: String,
    client: ClientWithMiddleware,
    analyzer: Arc<SentimentAnalyzer>,
}

impl NewsSentimentProvider {
    /// `url_template` must contain `{ticker}`.
    pub fn new(url_template: &str) -> Self {
        Self {
            url_template: url_template.to_string(),
            client: HttpClientFactory::create_client(),
            analyzer: Arc::new(SentimentAnalyzer::new()),
        }
    }

    /// The template with `{ticker}` replaced by the percent-encoded ticker.
    pub fn feed_url(&self, ticker: &str) -> Result<String> {
        let encoded: String = byte_serialize(ticker.as_bytes()).collect();
        let spliced = self.url_template.replace("{ticker}", &encoded);
        let url = Url::parse(&spliced)
            .with_context(|| format!("Invalid news feed URL: {}", spliced))?;
        Ok(url.into())
    }

    async fn fetch_headlines(&self, ticker: &str) -> Result<Vec<String>> {
        let url = self.feed_url(ticker)?;
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch news feed {}", url))?;
        if !response.status().is_success() {
            anyhow::bail!("News feed error ({}) for {}", response.status(), ticker);
        }
        let bytes = response.bytes().await.context("Failed to read RSS bytes")?;
        parse_headlines(&bytes)
    }
}

#[async_trait]
impl SentimentProvider for NewsSentimentProvider {
    async fn score(&self, ticker: &str) -> f64 {
        self.try_score(ticker).await.unwrap_or_else(|e| {
            warn!("NewsSentimentProvider: {} -> neutral: {:#}", ticker, e);
            0.0
        })
    }

    async fn try_score(&self, ticker: &str) -> Result<f64> {
        let headlines = self.fetch_headlines(ticker).await?;
        let score = self.analyzer.score_headlines(&headlines).clamp(-1.0, 1.0);
        debug!(
            "NewsSentimentProvider: {} scored {:.2} from {} headlines",
            ticker,
            score,
            headlines.len()
        );
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Yahoo! Finance: AAPL News</title>
  <link>https://finance.yahoo.com</link>
  <description>Latest headlines</description>
  <item><title>Apple beats estimates and raises guidance</title></item>
  <item><title>   </title></item>
  <item><description>no title here</description></item>
  <item><title>Apple supplier shares tumble</title></item>
</channel></rss>"#;

    #[test]
    fn test_parse_headlines_skips_missing_titles() {
        let titles = parse_headlines(FEED.as_bytes()).unwrap();
        assert_eq!(
            titles,
            vec![
                "Apple beats estimates and raises guidance".to_string(),
                "Apple supplier shares tumble".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_headlines(b"<html>not a feed</html>").is_err());
    }

    #[test]
    fn test_feed_url_substitutes_ticker() {
        let provider = NewsSentimentProvider::new(DEFAULT_RSS_URL_TEMPLATE);
        assert!(provider.feed_url("MSFT").unwrap().contains("s=MSFT&"));
    }

    #[test]
    fn test_feed_url_encodes_reserved_characters() {
        let provider = NewsSentimentProvider::new("https://news.test/rss?s={ticker}&lang=en");
        assert_eq!(
            provider.feed_url("A&B").unwrap(),
            "https://news.test/rss?s=A%26B&lang=en"
        );
        assert_eq!(
            provider.feed_url("^GSPC").unwrap(),
            "https://news.test/rss?s=%5EGSPC&lang=en"
        );
        assert_eq!(
            provider.feed_url("BRK.B").unwrap(),
            "https://news.test/rss?s=BRK.B&lang=en"
        );

        let in_path = NewsSentimentProvider::new("https://news.test/{ticker}/feed.xml");
        assert_eq!(
            in_path.feed_url("X/Y").unwrap(),
            "https://news.test/X%2FY/feed.xml"
        );
    }

    #[tokio::test]
    async fn test_unreachable_feed_is_an_error_and_scores_neutral() {
        let provider = NewsSentimentProvider::new("not a url {ticker}");
        assert!(provider.try_score("AAPL").await.is_err());
        assert_eq!(provider.score("AAPL").await, 0.0);
    }
}
