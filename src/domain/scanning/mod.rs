// Scan, backtest and evaluation records
pub mod backtest;
pub mod outcome;
pub mod prediction;

pub use backtest::{BacktestSummary, BacktestWindowResult, WalkForwardParams, WalkForwardWindow};
pub use outcome::{Outcome, OutcomeRecord, PerformanceSummary};
pub use prediction::Prediction;
