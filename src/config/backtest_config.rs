use super::{VarSource, parse_var};
use crate::domain::scanning::WalkForwardParams;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct BacktestEnvConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub train_years: i32,
    pub test_years: i32,
}

impl BacktestEnvConfig {
    pub fn from_vars(vars: &dyn VarSource) -> Result<Self> {
        Ok(Self {
            start_year: parse_var(vars, "BACKTEST_START_YEAR", 2010)?,
            end_year: parse_var(vars, "BACKTEST_END_YEAR", 2025)?,
            train_years: parse_var(vars, "BACKTEST_TRAIN_YEARS", 3)?,
            test_years: parse_var(vars, "BACKTEST_TEST_YEARS", 1)?,
        })
    }

    pub fn params(&self) -> WalkForwardParams {
        WalkForwardParams::default().with_years(
            self.start_year,
            self.end_year,
            self.train_years,
            self.test_years,
        )
    }
}
