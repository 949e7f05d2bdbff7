use super::{VarSource, parse_var, var_or};
use crate::application::scanner::ScanParams;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ScanEnvConfig {
    /// Universe tickers scanned per run
    pub limit: usize,
    pub lookback_days: i64,
    pub holdout_rows: usize,
    pub min_positive_labels: usize,
    pub concurrency: usize,
    pub prediction_log_path: PathBuf,
}

impl ScanEnvConfig {
    pub fn from_vars(vars: &dyn VarSource) -> Result<Self> {
        Ok(Self {
            limit: parse_var(vars, "SCAN_LIMIT", 100usize)?,
            lookback_days: parse_var(vars, "SCAN_LOOKBACK_DAYS", 1825i64)?,
            holdout_rows: parse_var(vars, "SCAN_HOLDOUT_ROWS", 20usize)?,
            min_positive_labels: parse_var(vars, "SCAN_MIN_POSITIVE_LABELS", 5usize)?,
            concurrency: parse_var(vars, "SCAN_CONCURRENCY", 4usize)?,
            prediction_log_path: PathBuf::from(var_or(
                vars,
                "PREDICTION_LOG_PATH",
                "predictions_log.csv",
            )),
        })
    }

    pub fn params(&self) -> ScanParams {
        ScanParams {
            lookback_days: self.lookback_days,
            holdout_rows: self.holdout_rows,
            min_positive_labels: self.min_positive_labels,
            concurrency: self.concurrency,
        }
    }
}
