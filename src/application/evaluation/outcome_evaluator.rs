use crate::domain::errors::ScanError;
use crate::domain::market::{Bar, DateRange};
use crate::domain::ports::{MarketDataService, PredictionLog};
use crate::domain::scanning::{Outcome, OutcomeRecord, Prediction};
use crate::infrastructure::observability::ScannerMetrics;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stop-loss / take-profit rule applied to each logged prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarrierParams {
    /// Stop price = entry × (1 - stop_loss_pct); a stop realizes exactly `-stop_loss_pct`.
    pub stop_loss_pct: Decimal,
    /// Target price = entry × (1 + take_profit_pct).
    pub take_profit_pct: Decimal,
    /// Calendar days fetched past `max_days` to cover weekends and holidays.
    pub extra_fetch_days: i64,
}

impl Default for BarrierParams {
    fn default() -> Self {
        Self {
            stop_loss_pct: dec!(0.03),
            take_profit_pct: dec!(0.05),
            extra_fetch_days: 5,
        }
    }
}

impl BarrierParams {
    pub fn stop_price(&self, entry: Decimal) -> Decimal {
        entry * (Decimal::ONE - self.stop_loss_pct)
    }

    pub fn target_price(&self, entry: Decimal) -> Decimal {
        entry * (Decimal::ONE + self.take_profit_pct)
    }

    /// `[date, date + max_days + extra_fetch_days)`
    pub fn fetch_range(&self, date: NaiveDate, max_days: i64) -> DateRange {
        DateRange::new(date, date + Duration::days(max_days + self.extra_fetch_days))
    }
}

/// Result of replaying bars against the barriers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarrierOutcome {
    pub outcome: Outcome,
    pub realized_return: f64,
    pub exit_price: Decimal,
    /// Close of the last bar replayed.
    pub future_price: Decimal,
}

fn simple_return(entry: Decimal, exit: Decimal) -> f64 {
    ((exit - entry) / entry).to_f64().unwrap_or(0.0)
}

/// First-touch replay of `bars` (chronological) for a long position entered at `entry`.
///
/// Each bar checks the stop before the target, so a bar that spans both is `Stopped`.
/// Returns `None` for an empty bar slice or a non-positive entry.
pub fn evaluate_barriers(
    entry: Decimal,
    bars: &[Bar],
    params: &BarrierParams,
) -> Option<BarrierOutcome> {
    let last = bars.last()?;
    if entry <= Decimal::ZERO {
        return None;
    }
    let stop = params.stop_price(entry);
    let target = params.target_price(entry);

    for bar in bars {
        if bar.low <= stop {
            return Some(BarrierOutcome {
                outcome: Outcome::Stopped,
                realized_return: -params.stop_loss_pct.to_f64().unwrap_or(0.0),
                exit_price: stop,
                future_price: last.close,
            });
        }
        if bar.high >= target {
            return Some(BarrierOutcome {
                outcome: Outcome::Hit,
                realized_return: simple_return(entry, bar.close),
                exit_price: bar.close,
                future_price: last.close,
            });
        }
    }

    Some(BarrierOutcome {
        outcome: Outcome::Hold,
        realized_return: simple_return(entry, last.close),
        exit_price: last.close,
        future_price: last.close,
    })
}

/// Replays market data after each logged prediction. Read-only on the log.
pub struct OutcomeEvaluator {
    market: Arc<dyn MarketDataService>,
    log: Arc<dyn PredictionLog>,
    params: BarrierParams,
    metrics: Option<ScannerMetrics>,
}

impl OutcomeEvaluator {
    pub fn new(
        market: Arc<dyn MarketDataService>,
        log: Arc<dyn PredictionLog>,
        params: BarrierParams,
    ) -> Self {
        Self {
            market,
            log,
            params,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ScannerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// One record per prediction at least `max_days` old as of `today`, in log order.
    ///
    /// Predictions without bars are skipped. A log read failure propagates.
    pub async fn evaluate(
        &self,
        max_days: i64,
        today: NaiveDate,
    ) -> Result<Vec<OutcomeRecord>, ScanError> {
        if max_days < 0 {
            return Err(ScanError::InvalidParameters {
                reason: format!("max_days must be non-negative, got {}", max_days),
            });
        }

        let predictions = self.log.load().await?;
        let total = predictions.len();
        let mut records = Vec::new();
        let mut too_recent = 0usize;

        for prediction in &predictions {
            if prediction.age_days(today) < max_days {
                too_recent += 1;
                continue;
            }
            match self.evaluate_one(prediction, max_days).await {
                Ok(record) => {
                    if let Some(m) = &self.metrics {
                        m.inc_outcome(&record.outcome.to_string());
                    }
                    records.push(record);
                }
                Err(e) => {
                    debug!(
                        "OutcomeEvaluator: skipping {} @ {}: {}",
                        prediction.ticker, prediction.date, e
                    );
                    if let Some(m) = &self.metrics {
                        m.inc_outcome("skipped");
                    }
                }
            }
        }

        info!(
            "OutcomeEvaluator: {} of {} predictions evaluated ({} younger than {} days)",
            records.len(),
            total,
            too_recent,
            max_days
        );
        Ok(records)
    }

    async fn evaluate_one(
        &self,
        prediction: &Prediction,
        max_days: i64,
    ) -> Result<OutcomeRecord, ScanError> {
        let range = self.params.fetch_range(prediction.date, max_days);
        let bars = self
            .market
            .get_daily_bars(&prediction.ticker, range)
            .await
            .map_err(|e| {
                warn!(
                    "OutcomeEvaluator: bar fetch failed for {}: {:#}",
                    prediction.ticker, e
                );
                ScanError::ProviderFailure {
                    provider: "market data".to_string(),
                    ticker: prediction.ticker.clone(),
                    reason: format!("{:#}", e),
                }
            })?;

        let barrier = evaluate_barriers(prediction.entry_price, &bars, &self.params)
            .ok_or_else(|| {
                ScanError::data_unavailable(&prediction.ticker, format!("no bars in {}", range))
            })?;

        Ok(OutcomeRecord {
            date: prediction.date,
            ticker: prediction.ticker.clone(),
            entry_price: prediction.entry_price,
            future_price: barrier.future_price,
            exit_price: barrier.exit_price,
            realized_return: barrier.realized_return,
            outcome: barrier.outcome,
            hit: barrier.outcome == Outcome::Hit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            close,
            high,
            low,
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_barrier_prices() {
        let p = BarrierParams::default();
        assert_eq!(p.stop_price(dec!(100)), dec!(97));
        assert_eq!(p.target_price(dec!(50)), dec!(52.5));
    }

    #[test]
    fn test_stop_has_priority_on_same_bar() {
        let bars = vec![bar(3, dec!(106), dec!(96), dec!(104))];
        let r = evaluate_barriers(dec!(100), &bars, &BarrierParams::default()).unwrap();
        assert_eq!(r.outcome, Outcome::Stopped);
        assert!((r.realized_return + 0.03).abs() < 1e-12);
        assert_eq!(r.exit_price, dec!(97));
    }

    #[test]
    fn test_touching_barrier_exactly_counts() {
        let params = BarrierParams::default();
        let stop = vec![bar(3, dec!(101), dec!(97), dec!(99))];
        assert_eq!(
            evaluate_barriers(dec!(100), &stop, &params).unwrap().outcome,
            Outcome::Stopped
        );
        let hit = vec![bar(3, dec!(105), dec!(99), dec!(104))];
        assert_eq!(
            evaluate_barriers(dec!(100), &hit, &params).unwrap().outcome,
            Outcome::Hit
        );
    }

    #[test]
    fn test_hit_realizes_breakout_close() {
        let bars = vec![
            bar(3, dec!(51), dec!(49.5), dec!(50.5)),
            bar(4, dec!(53), dec!(50), dec!(52.8)),
            bar(5, dec!(50), dec!(40), dec!(41)),
        ];
        let r = evaluate_barriers(dec!(50), &bars, &BarrierParams::default()).unwrap();
        assert_eq!(r.outcome, Outcome::Hit);
        assert!((r.realized_return - 0.056).abs() < 1e-12);
        assert_eq!(r.exit_price, dec!(52.8));
        assert_eq!(r.future_price, dec!(41));
    }

    #[test]
    fn test_hold_uses_last_close() {
        let bars = vec![
            bar(3, dec!(102), dec!(98), dec!(99)),
            bar(4, dec!(103), dec!(99), dec!(101)),
        ];
        let r = evaluate_barriers(dec!(100), &bars, &BarrierParams::default()).unwrap();
        assert_eq!(r.outcome, Outcome::Hold);
        assert!((r.realized_return - 0.01).abs() < 1e-12);
        assert_eq!(r.future_price, dec!(101));
    }

    #[test]
    fn test_empty_bars_is_none() {
        assert!(evaluate_barriers(dec!(100), &[], &BarrierParams::default()).is_none());
    }

    #[test]
    fn test_fetch_range_is_half_open() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let range = BarrierParams::default().fetch_range(d, 10);
        assert_eq!(range.start, d);
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 6, 18).unwrap());
    }
}
