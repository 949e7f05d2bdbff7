use crate::domain::errors::ScanError;
use crate::domain::ports::PredictionLog;
use crate::domain::scanning::Prediction;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

pub const LOG_HEADER: [&str; 4] = ["Ticker", "Prob_5perc", "EntryPrice", "Date"];

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One CSV line. Column names are part of the on-disk contract.
#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    #[serde(rename = "Ticker")]
    ticker: String,
    #[serde(rename = "Prob_5perc")]
    probability: f64,
    #[serde(rename = "EntryPrice")]
    entry_price: String,
    #[serde(rename = "Date")]
    date: String,
}

impl From<&Prediction> for LogRow {
    fn from(p: &Prediction) -> Self {
        Self {
            ticker: p.ticker.clone(),
            probability: p.probability,
            entry_price: p.entry_price.to_string(),
            date: p.date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl LogRow {
    fn into_prediction(self) -> Result<Prediction, String> {
        let entry_price = Decimal::from_str(self.entry_price.trim())
            .map_err(|e| format!("bad EntryPrice '{}': {}", self.entry_price, e))?;
        // Older logs may carry a time component after the date.
        let date_part = self.date.trim().get(..10).unwrap_or(self.date.trim());
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| format!("bad Date '{}': {}", self.date, e))?;
        Ok(Prediction::new(self.ticker, date, self.probability, entry_price))
    }
}

/// Cross-process exclusion via a sibling `.lock` file, removed on drop.
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    async fn acquire(path: PathBuf, timeout: Duration) -> Result<Self, String> {
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= timeout {
                        return Err(format!(
                            "lock {} still held after {:?}",
                            path.display(),
                            timeout
                        ));
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Err(e) => return Err(format!("cannot create lock {}: {}", path.display(), e)),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            error!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

/// Prediction log stored as a CSV file, rewritten whole on every append.
pub struct CsvPredictionLog {
    path: PathBuf,
    lock_timeout: Duration,
    write_guard: Mutex<()>,
}

impl CsvPredictionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: Duration::from_secs(10),
            write_guard: Mutex::new(()),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn failure(&self, reason: impl std::fmt::Display) -> ScanError {
        ScanError::persistence(self.path.display().to_string(), reason)
    }

    fn read_all(&self) -> Result<Vec<Prediction>, ScanError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| self.failure(e))?;
        let mut predictions = Vec::new();
        for (i, row) in reader.deserialize::<LogRow>().enumerate() {
            let row = row.map_err(|e| self.failure(e))?;
            let prediction = row
                .into_prediction()
                .map_err(|e| self.failure(format!("row {}: {}", i + 1, e)))?;
            predictions.push(prediction);
        }
        Ok(predictions)
    }

    fn write_all(&self, predictions: &[Prediction]) -> Result<(), ScanError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.failure(e))?;
        }

        // Atomic write: write to temp file then rename
        let temp_path = self.path.with_extension("csv.tmp");
        {
            let file = File::create(&temp_path).map_err(|e| self.failure(e))?;
            let mut writer = csv::Writer::from_writer(file);
            if predictions.is_empty() {
                writer.write_record(LOG_HEADER).map_err(|e| self.failure(e))?;
            }
            for p in predictions {
                writer
                    .serialize(LogRow::from(p))
                    .map_err(|e| self.failure(e))?;
            }
            writer.flush().map_err(|e| self.failure(e))?;
        }
        fs::rename(&temp_path, &self.path).map_err(|e| self.failure(e))?;
        Ok(())
    }
}

#[async_trait]
impl PredictionLog for CsvPredictionLog {
    async fn load(&self) -> Result<Vec<Prediction>, ScanError> {
        let predictions = self.read_all()?;
        debug!(
            "CsvPredictionLog: loaded {} predictions from {}",
            predictions.len(),
            self.path.display()
        );
        Ok(predictions)
    }

    async fn append(&self, new: &[Prediction]) -> Result<Vec<Prediction>, ScanError> {
        let _guard = self.write_guard.lock().await;
        let _lock = LockFile::acquire(self.lock_path(), self.lock_timeout)
            .await
            .map_err(|e| self.failure(e))?;

        let mut merged = self.read_all()?;
        merged.extend_from_slice(new);
        self.write_all(&merged).inspect_err(|e| {
            error!("CsvPredictionLog: append failed: {}", e);
        })?;

        info!(
            "CsvPredictionLog: appended {} predictions to {} ({} total)",
            new.len(),
            self.path.display(),
            merged.len()
        );
        Ok(merged)
    }
}

/// Process-local log for tests and dry runs.
#[derive(Default)]
pub struct InMemoryPredictionLog {
    entries: Mutex<Vec<Prediction>>,
}

impl InMemoryPredictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<Prediction>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl PredictionLog for InMemoryPredictionLog {
    async fn load(&self) -> Result<Vec<Prediction>, ScanError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn append(&self, new: &[Prediction]) -> Result<Vec<Prediction>, ScanError> {
        let mut entries = self.entries.lock().await;
        entries.extend_from_slice(new);
        Ok(entries.clone())
    }
}
