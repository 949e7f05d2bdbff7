use chrono::NaiveDate;
use crate::domain::market::DateRange;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Walk-forward parameters for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardParams {
    pub start_year: i32,
    /// Origins run up to, but excluding, `end_year - (train_window + test_window)`.
    pub end_year: i32,
    pub train_window: i32,
    pub test_window: i32,
    pub min_rows: usize,
    pub min_test_rows: usize,
    pub min_positive_labels: usize,
    /// Probabilities strictly above this binarize to a positive prediction.
    pub probability_threshold: f64,
}

impl Default for WalkForwardParams {
    fn default() -> Self {
        Self {
            start_year: 2010,
            end_year: 2025,
            train_window: 3,
            test_window: 1,
            min_rows: 100,
            min_test_rows: 10,
            min_positive_labels: 5,
            probability_threshold: 0.5,
        }
    }
}

impl WalkForwardParams {
    pub fn with_years(
        mut self,
        start_year: i32,
        end_year: i32,
        train_window: i32,
        test_window: i32,
    ) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self.train_window = train_window;
        self.test_window = test_window;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.train_window < 1 {
            return Err(format!(
                "train_window must be at least 1 year, got {}",
                self.train_window
            ));
        }
        if self.test_window < 1 {
            return Err(format!(
                "test_window must be at least 1 year, got {}",
                self.test_window
            ));
        }
        if self.horizon_end().is_none() {
            return Err(format!(
                "train_window {} + test_window {} overflows the year range ending {}",
                self.train_window, self.test_window, self.end_year
            ));
        }
        for year in [self.start_year, self.end_year] {
            if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
                return Err(format!("year {} is outside the supported calendar", year));
            }
        }
        if !(0.0..=1.0).contains(&self.probability_threshold) {
            return Err(format!(
                "probability_threshold must be in [0, 1], got {}",
                self.probability_threshold
            ));
        }
        Ok(())
    }

    /// `end_year - (train_window + test_window)`, or `None` on overflow.
    fn horizon_end(&self) -> Option<i32> {
        self.train_window
            .checked_add(self.test_window)
            .and_then(|span| self.end_year.checked_sub(span))
    }

    /// All origin windows, in year order. Empty when the window lengths overflow.
    pub fn windows(&self) -> Vec<WalkForwardWindow> {
        let Some(last_exclusive) = self.horizon_end() else {
            return Vec::new();
        };
        (self.start_year..last_exclusive)
            .filter_map(|year| WalkForwardWindow::new(year, self.train_window, self.test_window))
            .collect()
    }

    /// Calendar span covering every window, or `None` when there are no windows.
    pub fn span(&self) -> Option<DateRange> {
        let windows = self.windows();
        let first = windows.first()?;
        let last = windows.last()?;
        Some(DateRange::new(first.train.start, last.test.end))
    }
}

/// Train and test periods for one origin year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkForwardWindow {
    pub origin_year: i32,
    pub train: DateRange,
    pub test: DateRange,
}

impl WalkForwardWindow {
    pub fn new(origin_year: i32, train_window: i32, test_window: i32) -> Option<Self> {
        let train = DateRange::years(origin_year, train_window)?;
        let test = DateRange::years(origin_year.checked_add(train_window)?, test_window)?;
        Some(Self {
            origin_year,
            train,
            test,
        })
    }

    /// `[train.start, test.end)`: the only bars a window may see.
    pub fn span(&self) -> DateRange {
        DateRange::new(self.train.start, self.test.end)
    }
}

/// Out-of-sample scores for one origin year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestWindowResult {
    pub year: i32,
    pub hit_rate: f64,
    pub precision: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub predicted_positives: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub windows: usize,
    pub mean_hit_rate: f64,
    pub mean_precision: f64,
    /// Sample standard deviation; NaN with fewer than two windows.
    pub hit_rate_std_dev: f64,
    pub precision_std_dev: f64,
}

impl BacktestSummary {
    pub fn from_results(results: &[BacktestWindowResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let hit_rates: Vec<f64> = results.iter().map(|r| r.hit_rate).collect();
        let precisions: Vec<f64> = results.iter().map(|r| r.precision).collect();

        Some(Self {
            windows: results.len(),
            mean_hit_rate: hit_rates.iter().mean(),
            mean_precision: precisions.iter().mean(),
            hit_rate_std_dev: hit_rates.iter().std_dev(),
            precision_std_dev: precisions.iter().std_dev(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_cover_2010_through_2020() {
        let windows = WalkForwardParams::default().windows();
        assert_eq!(windows.len(), 11);
        assert_eq!(windows.first().unwrap().origin_year, 2010);
        assert_eq!(windows.last().unwrap().origin_year, 2020);
    }

    #[test]
    fn test_train_and_test_never_overlap() {
        for w in WalkForwardParams::default().with_years(2000, 2030, 4, 2).windows() {
            assert!(w.test.start >= w.train.end);
            assert_eq!(w.test.start, w.train.end);
            assert_eq!(w.span().start, w.train.start);
            assert_eq!(w.span().end, w.test.end);
        }
    }

    #[test]
    fn test_window_boundaries() {
        let w = WalkForwardWindow::new(2012, 3, 1).unwrap();
        assert_eq!(w.train.start.to_string(), "2012-01-01");
        assert_eq!(w.train.end.to_string(), "2015-01-01");
        assert_eq!(w.test.end.to_string(), "2016-01-01");
    }

    #[test]
    fn test_no_windows_when_range_too_short() {
        let params = WalkForwardParams::default().with_years(2020, 2024, 3, 1);
        assert!(params.windows().is_empty());
        assert!(params.span().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(WalkForwardParams::default().validate().is_ok());
        let bad = WalkForwardParams::default().with_years(2010, 2025, 0, 1);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_oversized_windows_are_rejected_not_panicking() {
        let params = WalkForwardParams::default().with_years(2010, 2025, i32::MAX, 1);
        assert!(params.validate().is_err());
        assert!(params.windows().is_empty());
        assert!(params.span().is_none());

        let far = WalkForwardParams::default().with_years(2010, 2025, 1_000_000, 1);
        assert!(far.validate().is_ok());
        assert!(far.windows().is_empty());

        assert!(WalkForwardWindow::new(i32::MAX - 1, 5, 1).is_none());
        let out_of_calendar = WalkForwardParams::default().with_years(i32::MIN, 2025, 3, 1);
        assert!(out_of_calendar.validate().is_err());
    }

    #[test]
    fn test_summary() {
        let results = vec![
            BacktestWindowResult {
                year: 2010,
                hit_rate: 0.6,
                precision: 0.5,
                train_rows: 700,
                test_rows: 240,
                predicted_positives: 10,
            },
            BacktestWindowResult {
                year: 2011,
                hit_rate: 0.8,
                precision: 0.0,
                train_rows: 700,
                test_rows: 240,
                predicted_positives: 0,
            },
        ];
        let summary = BacktestSummary::from_results(&results).unwrap();
        assert_eq!(summary.windows, 2);
        assert!((summary.mean_hit_rate - 0.7).abs() < 1e-12);
        assert!((summary.mean_precision - 0.25).abs() < 1e-12);
        assert!(summary.hit_rate_std_dev > 0.0);
        assert!(BacktestSummary::from_results(&[]).is_none());
    }
}
