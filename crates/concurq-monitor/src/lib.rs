//! # concurq Monitor
//!
//! Observes a running dispatcher from the outside.
//!
//! ## Features
//!
//! - Periodic metrics line (queue size, active workers, processed total, status counts)
//! - Stall detection for lock-order deadlocks
//! - Periodic JSON export of every task's status

pub mod error;
pub mod exporter;
pub mod metrics;
pub mod monitor;
pub mod snapshot;

pub use error::MonitorError;
pub use exporter::{JsonFileExporter, SnapshotExporter};
pub use metrics::{MetricsSample, detect_stall};
pub use monitor::TaskMonitor;
pub use snapshot::StatusSnapshot;
