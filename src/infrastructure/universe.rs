use crate::domain::ports::TickerUniverse;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::info;

pub const DEFAULT_UNIVERSE_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/main/data/constituents.csv";

const SYMBOL_COLUMN: &str = "Symbol";

/// Symbols from the `Symbol` column of a CSV document, in file order, blanks skipped.
pub fn parse_symbols(csv_text: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers().context("Universe CSV has no header")?;
    let column = headers
        .iter()
        .position(|h| h.trim() == SYMBOL_COLUMN)
        .with_context(|| format!("Universe CSV has no '{}' column", SYMBOL_COLUMN))?;

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed universe CSV row")?;
        if let Some(symbol) = record.get(column).map(str::trim).filter(|s| !s.is_empty()) {
            symbols.push(symbol.to_uppercase());
        }
    }
    Ok(symbols)
}

/// Index constituents fetched live from a CSV listing.
pub struct CsvTickerUniverse {
    url: String,
    client: ClientWithMiddleware,
}

impl CsvTickerUniverse {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: HttpClientFactory::create_client(),
        }
    }
}

#[async_trait]
impl TickerUniverse for CsvTickerUniverse {
    async fn constituents(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch universe from {}", self.url))?;
        if !response.status().is_success() {
            anyhow::bail!("Universe source error ({}): {}", response.status(), self.url);
        }
        let text = response.text().await.context("Failed to read universe body")?;
        let symbols = parse_symbols(&text)?;
        if symbols.is_empty() {
            anyhow::bail!("Universe source {} listed no symbols", self.url);
        }
        info!("CsvTickerUniverse: {} symbols from {}", symbols.len(), self.url);
        Ok(symbols)
    }
}

/// Fixed symbol list, e.g. from `SYMBOLS`.
#[derive(Debug, Clone)]
pub struct StaticTickerUniverse {
    symbols: Vec<String>,
}

impl StaticTickerUniverse {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Comma-separated list; blanks are dropped.
    pub fn from_csv_list(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty()),
        )
    }
}

#[async_trait]
impl TickerUniverse for StaticTickerUniverse {
    async fn constituents(&self) -> Result<Vec<String>> {
        Ok(self.symbols.clone())
    }
}
