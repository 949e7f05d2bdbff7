pub mod backtest;
pub mod context;
pub mod evaluation;
pub mod features;
pub mod ml;
pub mod scanner;

pub use context::ScannerContext;
