use crate::domain::errors::ScanError;
use crate::domain::market::{Bar, DateRange};
use crate::domain::ml::{FeatureParams, FeatureRow, FeatureSet, FeatureVector};
use crate::domain::ports::MarketDataService;
use crate::domain::sentiment::SentimentProvider;
use std::sync::Arc;
use ta::Next;
use ta::indicators::{SimpleMovingAverage, TrueRange};
use tracing::{debug, warn};

// Lets `ta` indicators consume bars directly.
impl ta::Open for Bar {
    fn open(&self) -> f64 {
        self.open_f64()
    }
}

impl ta::High for Bar {
    fn high(&self) -> f64 {
        self.high_f64()
    }
}

impl ta::Low for Bar {
    fn low(&self) -> f64 {
        self.low_f64()
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close_f64()
    }
}

impl ta::Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume_f64()
    }
}

const ZERO_EPSILON: f64 = 1e-12;

/// Simple moving average that reports `None` until its window is full.
struct WarmSma {
    sma: SimpleMovingAverage,
    period: usize,
    seen: usize,
}

impl WarmSma {
    fn new(period: usize) -> Result<Self, ScanError> {
        let sma = SimpleMovingAverage::new(period).map_err(|e| ScanError::InvalidParameters {
            reason: format!("moving average period {}: {:?}", period, e),
        })?;
        Ok(Self {
            sma,
            period,
            seen: 0,
        })
    }

    fn next(&mut self, value: f64) -> Option<f64> {
        let avg = self.sma.next(value);
        self.seen += 1;
        (self.seen >= self.period).then_some(avg)
    }
}

/// RSI over simple trailing means of gains and losses.
///
/// The first close only seeds the delta, so a value needs `period + 1` closes.
/// Flat windows (no gains and no losses) are undefined.
struct MeanRsi {
    gains: WarmSma,
    losses: WarmSma,
    prev_close: Option<f64>,
}

impl MeanRsi {
    fn new(period: usize) -> Result<Self, ScanError> {
        Ok(Self {
            gains: WarmSma::new(period)?,
            losses: WarmSma::new(period)?,
            prev_close: None,
        })
    }

    fn next(&mut self, close: f64) -> Option<f64> {
        let prev = self.prev_close.replace(close)?;
        let delta = close - prev;
        let avg_gain = self.gains.next(delta.max(0.0));
        let avg_loss = self.losses.next((-delta).max(0.0));

        let (gain, loss) = (avg_gain?, avg_loss?);
        if loss.abs() < ZERO_EPSILON {
            if gain.abs() < ZERO_EPSILON {
                return None;
            }
            return Some(100.0);
        }
        let rs = gain / loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

/// Trailing mean of true range.
struct MeanAtr {
    true_range: TrueRange,
    mean: WarmSma,
}

impl MeanAtr {
    fn new(period: usize) -> Result<Self, ScanError> {
        Ok(Self {
            true_range: TrueRange::new(),
            mean: WarmSma::new(period)?,
        })
    }

    fn next(&mut self, bar: &Bar) -> Option<f64> {
        let tr = self.true_range.next(bar);
        self.mean.next(tr)
    }
}

/// Turns raw daily bars into aligned feature rows and forward-looking labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder {
    params: FeatureParams,
}

impl FeatureBuilder {
    pub fn new(params: FeatureParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Builds features over `bars` (chronological, unique dates).
    ///
    /// Rows are emitted only once every indicator is defined. A row is labeled only when the
    /// bar `lookahead_days` sessions later exists inside `bars`; the remaining defined rows
    /// go to `unlabeled_tail`. `sentiment` is broadcast to every row.
    pub fn build(&self, ticker: &str, bars: &[Bar], sentiment: f64) -> Result<FeatureSet, ScanError> {
        if bars.is_empty() {
            return Err(ScanError::data_unavailable(ticker, "no bars in range"));
        }

        let p = &self.params;
        let mut rsi = MeanRsi::new(p.rsi_period)?;
        let mut sma_fast = WarmSma::new(p.sma_fast_period)?;
        let mut sma_slow = WarmSma::new(p.sma_slow_period)?;
        let mut atr = MeanAtr::new(p.atr_period)?;

        let closes: Vec<f64> = bars.iter().map(Bar::close_f64).collect();
        let mut set = FeatureSet {
            ticker: ticker.to_string(),
            rows: Vec::with_capacity(bars.len()),
            unlabeled_tail: Vec::new(),
        };

        for (i, bar) in bars.iter().enumerate() {
            // Every indicator must see every bar, even rows that end up dropped.
            let close = closes[i];
            let rsi_val = rsi.next(close);
            let fast_val = sma_fast.next(close);
            let slow_val = sma_slow.next(close);
            let atr_val = atr.next(bar);

            let (Some(rsi_val), Some(fast_val), Some(slow_val), Some(atr_val)) =
                (rsi_val, fast_val, slow_val, atr_val)
            else {
                continue;
            };
            if close <= 0.0 {
                continue;
            }

            let features = FeatureVector {
                rsi: rsi_val,
                sma_fast: fast_val,
                sma_slow: slow_val,
                atr: atr_val,
                sentiment,
            };

            let label = closes
                .get(i + p.lookahead_days)
                .map(|future| future / close - 1.0 > p.target_return);

            let row = FeatureRow {
                date: bar.date,
                features,
                label,
            };
            match label {
                Some(_) => set.rows.push(row),
                None => set.unlabeled_tail.push(row),
            }
        }

        debug!(
            "FeatureBuilder: {} -> {} labeled rows, {} unlabeled, {} positives from {} bars",
            ticker,
            set.rows.len(),
            set.unlabeled_tail.len(),
            set.positive_count(),
            bars.len()
        );
        Ok(set)
    }
}

/// Fetches bars and sentiment for a ticker and runs the feature builder over them.
pub struct FeaturePipeline {
    market: Arc<dyn MarketDataService>,
    sentiment: Arc<dyn SentimentProvider>,
    builder: FeatureBuilder,
}

impl FeaturePipeline {
    pub fn new(
        market: Arc<dyn MarketDataService>,
        sentiment: Arc<dyn SentimentProvider>,
        builder: FeatureBuilder,
    ) -> Self {
        Self {
            market,
            sentiment,
            builder,
        }
    }

    pub fn builder(&self) -> &FeatureBuilder {
        &self.builder
    }

    /// Bars for `ticker` in `range`; a provider error becomes `ProviderFailure`, an empty
    /// answer `DataUnavailable`.
    pub async fn fetch_bars(&self, ticker: &str, range: DateRange) -> Result<Vec<Bar>, ScanError> {
        let bars = self
            .market
            .get_daily_bars(ticker, range)
            .await
            .map_err(|e| {
                warn!("FeaturePipeline: bar fetch failed for {}: {:#}", ticker, e);
                ScanError::ProviderFailure {
                    provider: "market data".to_string(),
                    ticker: ticker.to_string(),
                    reason: format!("{:#}", e),
                }
            })?;
        if bars.is_empty() {
            return Err(ScanError::data_unavailable(
                ticker,
                format!("provider returned no bars for {}", range),
            ));
        }
        Ok(bars)
    }

    pub async fn sentiment(&self, ticker: &str) -> f64 {
        self.sentiment.score(ticker).await
    }

    /// Features and labels for `ticker` over `range`, sentiment fetched once per call.
    pub async fn build(&self, ticker: &str, range: DateRange) -> Result<FeatureSet, ScanError> {
        let bars = self.fetch_bars(ticker, range).await?;
        let sentiment = self.sentiment(ticker).await;
        self.builder.build(ticker, &bars, sentiment)
    }
}
