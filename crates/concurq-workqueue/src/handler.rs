//! Task processing seam.

use std::time::Duration;

use async_trait::async_trait;
use concurq_config::{DispatcherConfig, MillisRange};
use rand::Rng;

use crate::error::TaskError;
use crate::task::Task;

/// Task handler trait.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Process one attempt of a task while the worker holds its lock set.
    async fn handle(&self, task: &Task) -> Result<(), TaskError>;
}

/// Default handler: sleeps for a random duration and fails transiently with
/// a fixed probability.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    processing_time: MillisRange,
    failure_probability: f64,
}

impl SimulatedWork {
    pub fn new(processing_time: MillisRange, failure_probability: f64) -> Self {
        let failure_probability = if failure_probability.is_nan() {
            0.0
        } else {
            failure_probability.clamp(0.0, 1.0)
        };
        Self {
            processing_time,
            failure_probability,
        }
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::new(config.processing_time, config.failure_probability)
    }

    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }
}

#[async_trait]
impl TaskHandler for SimulatedWork {
    async fn handle(&self, task: &Task) -> Result<(), TaskError> {
        tokio::time::sleep(pick_duration(self.processing_time)).await;

        if rand::thread_rng().gen_bool(self.failure_probability) {
            return Err(TaskError::Transient(format!(
                "Simulated failure processing {}",
                task.name()
            )));
        }
        Ok(())
    }
}

/// Uniformly random duration within `range`. An inverted range yields its minimum.
pub(crate) fn pick_duration(range: MillisRange) -> Duration {
    if range.min_ms >= range.max_ms {
        return range.min();
    }
    Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..=range.max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_duration_within_range() {
        let range = MillisRange::new(50, 150);
        for _ in 0..100 {
            let d = pick_duration(range);
            assert!(d >= Duration::from_millis(50) && d <= Duration::from_millis(150));
        }
        assert_eq!(pick_duration(MillisRange::fixed(7)), Duration::from_millis(7));
    }

    #[test]
    fn test_failure_probability_clamped() {
        assert_eq!(SimulatedWork::new(MillisRange::fixed(0), 1.7).failure_probability(), 1.0);
        assert_eq!(SimulatedWork::new(MillisRange::fixed(0), -1.0).failure_probability(), 0.0);
        assert_eq!(SimulatedWork::new(MillisRange::fixed(0), f64::NAN).failure_probability(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_work_outcomes() {
        let task = Task::new("t", 1, "");

        let always_ok = SimulatedWork::new(MillisRange::new(200, 2000), 0.0);
        assert!(always_ok.handle(&task).await.is_ok());

        let always_fail = SimulatedWork::new(MillisRange::fixed(10), 1.0);
        let err = always_fail.handle(&task).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_work_sleeps() {
        let task = Task::new("t", 1, "");
        let work = SimulatedWork::new(MillisRange::fixed(500), 0.0);

        let start = tokio::time::Instant::now();
        work.handle(&task).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
