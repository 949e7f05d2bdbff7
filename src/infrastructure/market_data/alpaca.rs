use crate::domain::market::bar::normalize_bars;
use crate::domain::market::{Bar, DateRange};
use crate::domain::ports::MarketDataService;
use crate::infrastructure::core::HttpClientFactory;
use crate::infrastructure::core::http_client_factory::build_url_with_query;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate};
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error};

pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

impl AlpacaBar {
    pub fn to_bar(&self) -> Result<Bar> {
        let date = DateTime::parse_from_rfc3339(&self.timestamp)
            .with_context(|| format!("Invalid bar timestamp: {}", self.timestamp))?
            .date_naive();
        let dec = |v: f64, field: &str| {
            Decimal::try_from(v).with_context(|| format!("Invalid {} value {}", field, v))
        };
        Ok(Bar::new(
            date,
            dec(self.open, "open")?,
            dec(self.high, "high")?,
            dec(self.low, "low")?,
            dec(self.close, "close")?,
            dec(self.volume, "volume")?,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct AlpacaBarsResponse {
    /// `null` when no symbol has data in the range.
    bars: Option<HashMap<String, Vec<AlpacaBar>>>,
    next_page_token: Option<String>,
}

/// Daily stock bars from the Alpaca market data API (IEX feed).
pub struct AlpacaMarketDataService {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    data_base_url: String,
}

impl AlpacaMarketDataService {
    pub fn new(api_key: String, api_secret: String, data_base_url: String) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            api_key,
            api_secret,
            data_base_url: data_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Pages through `/v2/stocks/bars` for all `symbols` and returns raw bars per symbol.
    async fn fetch_bars_internal(
        &self,
        symbols: &[String],
        range: DateRange,
    ) -> Result<HashMap<String, Vec<AlpacaBar>>> {
        let url = format!("{}/v2/stocks/bars", self.data_base_url);
        // Alpaca treats `end` as inclusive.
        let last_day: NaiveDate = range.end - Duration::days(1);

        let mut all_bars: HashMap<String, Vec<AlpacaBar>> = HashMap::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("symbols", symbols.join(",")),
                ("start", range.start.format("%Y-%m-%d").to_string()),
                ("end", last_day.format("%Y-%m-%d").to_string()),
                ("timeframe", "1Day".to_string()),
                ("limit", "10000".to_string()),
                ("adjustment", "all".to_string()),
                ("feed", "iex".to_string()),
            ];
            if let Some(token) = &page_token {
                query_params.push(("page_token", token.clone()));
            }

            debug!(
                "AlpacaMarketDataService: fetching daily bars for {} symbols in {}",
                symbols.len(),
                range
            );

            let url_with_query = build_url_with_query(&url, &query_params)?;
            let response = self
                .client
                .get(&url_with_query)
                .header("APCA-API-KEY-ID", &self.api_key)
                .header("APCA-API-SECRET-KEY", &self.api_secret)
                .send()
                .await
                .context("Failed to fetch bars from Alpaca")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "AlpacaMarketDataService: API error {} for {}: {}",
                    status,
                    symbols.join(","),
                    error_text
                );
                anyhow::bail!("Alpaca API error ({}): {}", status, error_text);
            }

            let body: AlpacaBarsResponse = response
                .json()
                .await
                .context("Failed to parse bars response")?;

            for (symbol, bars) in body.bars.unwrap_or_default() {
                all_bars.entry(symbol).or_default().extend(bars);
            }

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(all_bars)
    }
}

/// Converts raw bars, keeping only sessions inside `range`.
pub fn convert_bars(raw: &[AlpacaBar], range: DateRange) -> Result<Vec<Bar>> {
    let bars = raw
        .iter()
        .map(AlpacaBar::to_bar)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|b| range.contains(b.date))
        .collect();
    Ok(normalize_bars(bars))
}

#[async_trait]
impl MarketDataService for AlpacaMarketDataService {
    async fn get_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.fetch_bars_internal(&[ticker.to_string()], range).await?;
        match raw.get(ticker) {
            Some(bars) => convert_bars(bars, range),
            None => Ok(Vec::new()),
        }
    }

    async fn get_daily_bars_batch(
        &self,
        tickers: &[String],
        range: DateRange,
    ) -> Result<HashMap<String, Vec<Bar>>> {
        if range.is_empty() || tickers.is_empty() {
            return Ok(HashMap::new());
        }
        let raw = self.fetch_bars_internal(tickers, range).await?;
        let mut out = HashMap::with_capacity(raw.len());
        for (symbol, bars) in raw {
            let converted = convert_bars(&bars, range)?;
            if !converted.is_empty() {
                out.insert(symbol, converted);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(t: &str, close: f64) -> AlpacaBar {
        AlpacaBar {
            timestamp: t.to_string(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1200.0,
        }
    }

    #[test]
    fn test_parse_response_page() {
        let json = r#"{
            "bars": {"AAPL": [{"t": "2024-03-04T05:00:00Z", "o": 175.1, "h": 176.0, "l": 173.5, "c": 175.5, "v": 51234}]},
            "next_page_token": null
        }"#;
        let body: AlpacaBarsResponse = serde_json::from_str(json).unwrap();
        let bars = body.bars.unwrap();
        let bar = bars["AAPL"][0].to_bar().unwrap();
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(bar.close, dec!(175.5));
        assert!(body.next_page_token.is_none());
    }

    #[test]
    fn test_null_bars_parse_as_empty() {
        let body: AlpacaBarsResponse =
            serde_json::from_str(r#"{"bars": null, "next_page_token": null}"#).unwrap();
        assert!(body.bars.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_convert_filters_and_sorts() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
        );
        let bars = convert_bars(
            &[
                raw("2024-03-05T05:00:00Z", 11.0),
                raw("2024-03-04T05:00:00Z", 10.0),
                raw("2024-03-06T05:00:00Z", 12.0),
            ],
            range,
        )
        .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(10));
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        assert!(raw("yesterday", 1.0).to_bar().is_err());
    }
}
