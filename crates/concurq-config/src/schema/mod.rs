//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod schema_dispatcher;
mod schema_monitor;

pub use schema_dispatcher::*;
pub use schema_monitor::*;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Producers started by a simulation run.
    #[serde(default = "default_producers")]
    pub producers: Vec<ProducerConfig>,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            producers: default_producers(),
            monitor: MonitorConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_producers() -> Vec<ProducerConfig> {
    vec![
        ProducerConfig::new("Producer-HighPriority-1"),
        ProducerConfig::new("Producer-LowPriority-1"),
    ]
}

/// Simulation run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// How long a run lasts before shutdown is initiated.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
        }
    }
}

fn default_duration_secs() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
