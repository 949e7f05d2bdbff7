//! Observability for scan runs: prometheus counters rendered on demand by the CLI.

pub mod metrics;

pub use metrics::ScannerMetrics;
