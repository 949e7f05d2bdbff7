use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One daily trading session for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    pub fn new(
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    pub fn high_f64(&self) -> f64 {
        self.high.to_f64().unwrap_or(0.0)
    }

    pub fn low_f64(&self) -> f64 {
        self.low.to_f64().unwrap_or(0.0)
    }

    pub fn open_f64(&self) -> f64 {
        self.open.to_f64().unwrap_or(0.0)
    }

    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or(0.0)
    }
}

/// Sorts bars chronologically and drops repeated dates, keeping the first occurrence.
///
/// Providers may page or batch their responses; downstream code relies on a strictly
/// increasing date sequence.
pub fn normalize_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}
