//! Dispatcher, worker and producer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling on retry attempts for a single task.
pub const MAX_RETRIES: u32 = 3;

/// Lock acquisition discipline used by every worker in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockOrderMode {
    /// Always A then B.
    #[default]
    Fixed,
    /// A-then-B or B-then-A depending on the task id.
    Conflicting,
}

impl std::fmt::Display for LockOrderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockOrderMode::Fixed => write!(f, "fixed"),
            LockOrderMode::Conflicting => write!(f, "conflicting"),
        }
    }
}

impl std::str::FromStr for LockOrderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(LockOrderMode::Fixed),
            "conflicting" => Ok(LockOrderMode::Conflicting),
            other => Err(format!(
                "unknown lock order '{}', expected 'fixed' or 'conflicting'",
                other
            )),
        }
    }
}

/// Inclusive range of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MillisRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl MillisRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Number of worker loops in the pool.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Maximum number of tasks resident in the queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub lock_order: LockOrderMode,

    /// Retry attempts per task, at most [`MAX_RETRIES`].
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Probability in `[0, 1]` that a simulated attempt fails.
    #[serde(default = "default_failure_probability")]
    pub failure_probability: f64,

    /// How long the first lock is held before the second is attempted.
    #[serde(default = "default_lock_hold")]
    pub lock_hold: MillisRange,

    /// Simulated processing time while holding both locks.
    #[serde(default = "default_processing_time")]
    pub processing_time: MillisRange,

    /// Grace period for workers to finish their current task on shutdown.
    #[serde(default = "default_graceful_timeout_ms")]
    pub graceful_timeout_ms: u64,

    /// Grace period after workers have been interrupted.
    #[serde(default = "default_forced_timeout_ms")]
    pub forced_timeout_ms: u64,
}

impl DispatcherConfig {
    pub fn graceful_timeout(&self) -> Duration {
        Duration::from_millis(self.graceful_timeout_ms)
    }

    pub fn forced_timeout(&self) -> Duration {
        Duration::from_millis(self.forced_timeout_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            queue_capacity: default_queue_capacity(),
            lock_order: LockOrderMode::default(),
            max_retries: default_max_retries(),
            failure_probability: default_failure_probability(),
            lock_hold: default_lock_hold(),
            processing_time: default_processing_time(),
            graceful_timeout_ms: default_graceful_timeout_ms(),
            forced_timeout_ms: default_forced_timeout_ms(),
        }
    }
}

fn default_worker_pool_size() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    20
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_failure_probability() -> f64 {
    0.1
}

fn default_lock_hold() -> MillisRange {
    MillisRange::new(50, 150)
}

fn default_processing_time() -> MillisRange {
    MillisRange::new(200, 2000)
}

fn default_graceful_timeout_ms() -> u64 {
    30_000
}

fn default_forced_timeout_ms() -> u64 {
    10_000
}

/// A single producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Producer name; also selects the priority class ("high", "low", or mixed).
    pub name: String,

    #[serde(default = "default_task_count")]
    pub task_count: u32,

    /// Delay between two generated tasks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl ProducerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_count: default_task_count(),
            interval_ms: default_interval_ms(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_task_count() -> u32 {
    10
}

fn default_interval_ms() -> u64 {
    1000
}
