use crate::domain::ml::ClassifierError;
use thiserror::Error;

/// Failure taxonomy for scan, backtest and evaluation runs.
///
/// `DataUnavailable`, `InsufficientSignal` and `ProviderFailure` are contained at the
/// ticker or window that raised them. `PersistenceFailure` and `UniverseUnavailable` abort
/// the run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No data for {ticker}: {reason}")]
    DataUnavailable { ticker: String, reason: String },

    #[error("Insufficient signal for {ticker}: {reason}")]
    InsufficientSignal { ticker: String, reason: String },

    #[error("{provider} failed for {ticker}: {reason}")]
    ProviderFailure {
        provider: String,
        ticker: String,
        reason: String,
    },

    #[error("Model failure for {ticker}: {source}")]
    Model {
        ticker: String,
        #[source]
        source: ClassifierError,
    },

    #[error("Prediction log failure at {path}: {reason}")]
    PersistenceFailure { path: String, reason: String },

    #[error("Ticker universe unavailable: {reason}")]
    UniverseUnavailable { reason: String },

    #[error("Invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("Worker task failed: {reason}")]
    WorkerFailed { reason: String },
}

impl ScanError {
    /// Whether the error must stop the whole run rather than skip one unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::PersistenceFailure { .. }
                | ScanError::UniverseUnavailable { .. }
                | ScanError::InvalidParameters { .. }
                | ScanError::WorkerFailed { .. }
        )
    }

    /// Short label used for metrics and skip logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::DataUnavailable { .. } => "data_unavailable",
            ScanError::InsufficientSignal { .. } => "insufficient_signal",
            ScanError::ProviderFailure { .. } => "provider_failure",
            ScanError::Model { .. } => "model_failure",
            ScanError::PersistenceFailure { .. } => "persistence_failure",
            ScanError::UniverseUnavailable { .. } => "universe_unavailable",
            ScanError::InvalidParameters { .. } => "invalid_parameters",
            ScanError::WorkerFailed { .. } => "worker_failed",
        }
    }

    pub fn data_unavailable(ticker: &str, reason: impl Into<String>) -> Self {
        ScanError::DataUnavailable {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn insufficient_signal(ticker: &str, reason: impl Into<String>) -> Self {
        ScanError::InsufficientSignal {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }

    pub fn persistence(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ScanError::PersistenceFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
