use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered list of feature names.
/// This order MUST match `FeatureVector::to_vec`; classifiers see columns in this order.
pub const FEATURE_NAMES: &[&str] = &["rsi", "sma_fast", "sma_slow", "atr", "sentiment"];

pub const RSI_PERIOD: usize = 14;
pub const SMA_FAST_PERIOD: usize = 20;
pub const SMA_SLOW_PERIOD: usize = 50;
pub const ATR_PERIOD: usize = 14;
pub const LOOKAHEAD_DAYS: usize = 5;
pub const TARGET_RETURN: f64 = 0.05;

/// Indicator periods and labeling rule used by the feature builder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureParams {
    pub rsi_period: usize,
    pub sma_fast_period: usize,
    pub sma_slow_period: usize,
    pub atr_period: usize,
    /// Sessions between a row and the close its label is measured against.
    pub lookahead_days: usize,
    /// Strict lower bound on the forward return for a positive label.
    pub target_return: f64,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            rsi_period: RSI_PERIOD,
            sma_fast_period: SMA_FAST_PERIOD,
            sma_slow_period: SMA_SLOW_PERIOD,
            atr_period: ATR_PERIOD,
            lookahead_days: LOOKAHEAD_DAYS,
            target_return: TARGET_RETURN,
        }
    }
}

/// Per-date model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub rsi: f64,
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub atr: f64,
    pub sentiment: f64,
}

impl FeatureVector {
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.rsi,
            self.sma_fast,
            self.sma_slow,
            self.atr,
            self.sentiment,
        ]
    }
}

/// A dated feature vector, with its label once the lookahead bar exists.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub features: FeatureVector,
    pub label: Option<bool>,
}

/// Output of one feature build.
///
/// `rows` holds only labeled rows, in date order. `unlabeled_tail` holds the most recent
/// rows whose indicators are defined but whose lookahead bar does not exist yet; they are
/// never used for training.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub ticker: String,
    pub rows: Vec<FeatureRow>,
    pub unlabeled_tail: Vec<FeatureRow>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn features(&self) -> Vec<FeatureVector> {
        self.rows.iter().map(|r| r.features).collect()
    }

    pub fn labels(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.label.unwrap_or(false)).collect()
    }

    pub fn positive_count(&self) -> usize {
        self.rows.iter().filter(|r| r.label == Some(true)).count()
    }

    /// Most recent row with defined indicators, labeled or not.
    pub fn latest(&self) -> Option<&FeatureRow> {
        self.unlabeled_tail.last().or_else(|| self.rows.last())
    }
}

pub fn positive_count(labels: &[bool]) -> usize {
    labels.iter().filter(|&&l| l).count()
}
