//! Data provider configuration: market data, ticker universe, news and caching.

use super::{VarSource, parse_var, var_or};
use crate::infrastructure::market_data::alpaca::DEFAULT_DATA_URL;
use crate::infrastructure::news::rss::DEFAULT_RSS_URL_TEMPLATE;
use crate::infrastructure::universe::DEFAULT_UNIVERSE_URL;
use anyhow::Result;
use std::str::FromStr;

/// Where market data and the universe come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Synthetic bars, static universe, neutral sentiment. No network.
    Mock,
    Alpaca,
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Mode::Mock),
            "alpaca" => Ok(Mode::Alpaca),
            _ => anyhow::bail!("Invalid MODE: {}. Must be 'mock' or 'alpaca'", s),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderEnvConfig {
    pub mode: Mode,
    pub alpaca_api_key: String,
    pub alpaca_secret_key: String,
    pub alpaca_data_url: String,
    pub universe_url: String,
    /// Static universe; overrides `universe_url` when non-empty.
    pub symbols: Vec<String>,
    pub news_rss_url_template: String,
    pub cache_ttl_seconds: u64,
}

impl ProviderEnvConfig {
    pub fn from_vars(vars: &dyn VarSource) -> Result<Self> {
        let mode = Mode::from_str(&var_or(vars, "MODE", "mock"))?;
        let symbols = var_or(vars, "SYMBOLS", "")
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            mode,
            alpaca_api_key: var_or(vars, "ALPACA_API_KEY", ""),
            alpaca_secret_key: var_or(vars, "ALPACA_SECRET_KEY", ""),
            alpaca_data_url: var_or(vars, "ALPACA_DATA_URL", DEFAULT_DATA_URL),
            universe_url: var_or(vars, "UNIVERSE_URL", DEFAULT_UNIVERSE_URL),
            symbols,
            news_rss_url_template: var_or(vars, "NEWS_RSS_URL_TEMPLATE", DEFAULT_RSS_URL_TEMPLATE),
            cache_ttl_seconds: parse_var(vars, "CACHE_TTL_SECONDS", 3600u64)?,
        })
    }
}
