//! Monitor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Metrics sampling interval.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Snapshot export interval.
    #[serde(default = "default_export_interval_ms")]
    pub export_interval_ms: u64,

    /// Snapshot destination. Export is disabled when unset.
    #[serde(default = "default_export_path")]
    pub export_path: Option<PathBuf>,
}

impl MonitorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn export_interval(&self) -> Duration {
        Duration::from_millis(self.export_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            export_interval_ms: default_export_interval_ms(),
            export_path: default_export_path(),
        }
    }
}

fn default_sample_interval_ms() -> u64 {
    5_000
}

fn default_export_interval_ms() -> u64 {
    60_000
}

fn default_export_path() -> Option<PathBuf> {
    Some(PathBuf::from("task_statuses.json"))
}
