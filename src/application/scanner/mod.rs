pub mod scan_engine;

pub use scan_engine::{ScanEngine, ScanParams, ScanReport, TickerResult};
