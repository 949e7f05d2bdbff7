use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Target touched before the stop.
    Hit,
    /// Stop touched first (or on the same bar as the target).
    Stopped,
    /// Neither barrier touched inside the holding window.
    Hold,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Hit => write!(f, "Hit"),
            Outcome::Stopped => write!(f, "Stopped"),
            Outcome::Hold => write!(f, "Hold"),
        }
    }
}

/// Realized result of one logged prediction. Derived on demand, never written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutcomeRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub entry_price: Decimal,
    /// Close of the last bar in the evaluation window.
    pub future_price: Decimal,
    /// Price the simulated position was closed at.
    pub exit_price: Decimal,
    pub realized_return: f64,
    pub outcome: Outcome,
    pub hit: bool,
}

/// Aggregate view over a batch of outcome records.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub evaluated: usize,
    pub hit_rate: f64,
    pub average_return: f64,
    /// Compounded `1 + return` in record order.
    pub equity_curve: Vec<(NaiveDate, f64)>,
}

impl PerformanceSummary {
    pub fn from_records(records: &[OutcomeRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let hits = records.iter().filter(|r| r.hit).count() as f64;
        let average_return = records.iter().map(|r| r.realized_return).mean();

        let mut equity = 1.0;
        let equity_curve = records
            .iter()
            .map(|r| {
                equity *= 1.0 + r.realized_return;
                (r.date, equity)
            })
            .collect();

        Some(Self {
            evaluated: records.len(),
            hit_rate: hits / records.len() as f64,
            average_return,
            equity_curve,
        })
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().map(|(_, e)| *e).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(day: u32, ret: f64, outcome: Outcome) -> OutcomeRecord {
        OutcomeRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            ticker: "MSFT".to_string(),
            entry_price: dec!(100),
            future_price: dec!(100),
            exit_price: dec!(100),
            realized_return: ret,
            outcome,
            hit: outcome == Outcome::Hit,
        }
    }

    #[test]
    fn test_summary_empty_is_none() {
        assert!(PerformanceSummary::from_records(&[]).is_none());
    }

    #[test]
    fn test_summary_compounds_returns() {
        let records = vec![
            record(1, 0.10, Outcome::Hit),
            record(2, -0.03, Outcome::Stopped),
            record(3, 0.01, Outcome::Hold),
            record(4, 0.06, Outcome::Hit),
        ];
        let summary = PerformanceSummary::from_records(&records).unwrap();

        assert_eq!(summary.evaluated, 4);
        assert!((summary.hit_rate - 0.5).abs() < 1e-12);
        assert!((summary.average_return - 0.035).abs() < 1e-12);
        let expected = 1.10 * 0.97 * 1.01 * 1.06;
        assert!((summary.final_equity() - expected).abs() < 1e-12);
        assert_eq!(summary.equity_curve.len(), 4);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Stopped.to_string(), "Stopped");
    }
}
