use crate::domain::market::{Bar, DateRange};
use crate::domain::ports::MarketDataService;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashSet;

/// Offline market data: a seeded random walk per ticker over weekdays.
///
/// Every ticker's path starts at `origin`, so a given (ticker, date) always maps to the
/// same bar no matter which range is requested.
#[derive(Debug, Clone)]
pub struct SyntheticMarketDataService {
    seed: u64,
    origin: NaiveDate,
    start_price: f64,
    daily_volatility: f64,
    daily_drift: f64,
    unavailable: HashSet<String>,
}

impl SyntheticMarketDataService {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            origin: NaiveDate::from_ymd_opt(2005, 1, 3).unwrap_or_default(),
            start_price: 50.0,
            daily_volatility: 0.02,
            daily_drift: 0.0003,
            unavailable: HashSet::new(),
        }
    }

    pub fn with_volatility(mut self, daily_volatility: f64) -> Self {
        self.daily_volatility = daily_volatility;
        self
    }

    /// Tickers for which the service returns no bars.
    pub fn without<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unavailable.extend(tickers.into_iter().map(Into::into));
        self
    }

    fn ticker_seed(&self, ticker: &str) -> u64 {
        // FNV-1a keeps the seed stable across toolchains.
        ticker.bytes().fold(0xcbf2_9ce4_8422_2325_u64 ^ self.seed, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }

    fn generate(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>> {
        let daily_return = Normal::new(self.daily_drift, self.daily_volatility).map_err(|e| {
            anyhow::anyhow!(
                "invalid synthetic volatility {}: {}",
                self.daily_volatility,
                e
            )
        })?;
        let mut rng = StdRng::seed_from_u64(self.ticker_seed(ticker));
        let mut close = self.start_price * (0.5 + rng.random::<f64>());
        let mut bars = Vec::new();
        let mut date = self.origin;

        while date < range.end {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date += Duration::days(1);
                continue;
            }
            let step = daily_return.sample(&mut rng);
            let wick_up: f64 = rng.random::<f64>() * self.daily_volatility;
            let wick_down: f64 = rng.random::<f64>() * self.daily_volatility;
            let volume: f64 = rng.random_range(100_000.0..5_000_000.0);

            let open = close;
            close = (open * (1.0 + step)).max(1.0);
            let high = open.max(close) * (1.0 + wick_up);
            let low = open.min(close) * (1.0 - wick_down);

            if range.contains(date) && !self.unavailable.contains(ticker) {
                let price = |v: f64| Decimal::from_f64(v).map(|d| d.round_dp(2));
                if let (Some(o), Some(h), Some(l), Some(c), Some(v)) = (
                    price(open),
                    price(high),
                    price(low),
                    price(close),
                    Decimal::from_f64(volume.round()),
                ) {
                    bars.push(Bar::new(date, o, h, l, c, v));
                }
            }
            date += Duration::days(1);
        }
        Ok(bars)
    }
}

impl Default for SyntheticMarketDataService {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl MarketDataService for SyntheticMarketDataService {
    async fn get_daily_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>> {
        if self.unavailable.contains(ticker) || range.is_empty() {
            return Ok(Vec::new());
        }
        self.generate(ticker, range)
    }
}
