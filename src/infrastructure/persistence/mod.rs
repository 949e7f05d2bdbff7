pub mod prediction_log;

pub use prediction_log::{CsvPredictionLog, InMemoryPredictionLog};
