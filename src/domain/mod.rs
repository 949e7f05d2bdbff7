// Price history domain
pub mod market;

// Features and the classifier contract
pub mod ml;

// Predictions, backtest windows and outcomes
pub mod scanning;

// Port interfaces
pub mod ports;

// News sentiment
pub mod sentiment;

// Domain-specific error types
pub mod errors;
