use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A logged probability that `ticker` gains more than the target return within the
/// lookahead horizon, as of `date`. Immutable once logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub ticker: String,
    pub date: NaiveDate,
    pub probability: f64,
    /// Latest known close when the prediction was made.
    pub entry_price: Decimal,
}

impl Prediction {
    pub fn new(
        ticker: impl Into<String>,
        date: NaiveDate,
        probability: f64,
        entry_price: Decimal,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            probability,
            entry_price,
        }
    }

    /// Whole calendar days between the prediction date and `today`.
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.date).num_days()
    }
}

/// Sorts by probability, highest first. Stable, so equal probabilities keep log order.
pub fn rank_by_probability(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
    });
}
