//! Task producers.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::queue::TaskQueue;
use crate::status::StatusStore;
use crate::task::{Task, TaskStatus};

/// Priority class derived from a producer's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityClass {
    /// Priorities 1..=3.
    High,
    /// Priorities 5..=9.
    Low,
    /// Priorities 1..=9.
    Mixed,
}

impl PriorityClass {
    /// `high` wins over `low` when a name contains both. Case-insensitive.
    pub fn from_producer_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("high") {
            PriorityClass::High
        } else if lower.contains("low") {
            PriorityClass::Low
        } else {
            PriorityClass::Mixed
        }
    }

    pub fn priority_range(self) -> RangeInclusive<i32> {
        match self {
            PriorityClass::High => 1..=3,
            PriorityClass::Low => 5..=9,
            PriorityClass::Mixed => 1..=9,
        }
    }

    pub fn task_prefix(self) -> &'static str {
        match self {
            PriorityClass::High => "UrgentTask",
            PriorityClass::Low => "RoutineTask",
            PriorityClass::Mixed => "MixedTask",
        }
    }

    /// Build the `n`th task (1-based) for `producer`.
    pub fn build_task(self, producer: &str, n: u32) -> Task {
        let priority = rand::thread_rng().gen_range(self.priority_range());
        let name = format!("{}-{}-{}", self.task_prefix(), producer, n);
        let payload = format!("Data for {} (Priority: {})", name, priority);
        Task::new(name, priority, payload)
    }
}

/// Summary returned when a producer finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    pub name: String,
    /// Tasks accepted by the queue.
    pub submitted: u32,
    /// Whether the producer stopped before generating every task.
    pub cancelled: bool,
}

/// Generates `count` tasks at a fixed cadence.
pub struct TaskProducer {
    name: String,
    count: u32,
    interval: Duration,
    class: PriorityClass,
    queue: Arc<TaskQueue>,
    statuses: Arc<StatusStore>,
}

impl TaskProducer {
    pub fn new(
        name: impl Into<String>,
        count: u32,
        interval: Duration,
        queue: Arc<TaskQueue>,
        statuses: Arc<StatusStore>,
    ) -> Self {
        let name = name.into();
        let class = PriorityClass::from_producer_name(&name);
        Self {
            name,
            count,
            interval,
            class,
            queue,
            statuses,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit tasks until `count` is reached or `cancel` fires.
    ///
    /// A task is recorded SUBMITTED only once it is in the queue; a task whose
    /// `put` is abandoned leaves no status entry.
    pub async fn run(self, cancel: CancellationToken) -> ProducerReport {
        info!(producer = %self.name, "Producer started");
        let mut submitted = 0;
        let mut cancelled = false;

        for n in 1..=self.count {
            let task = self.class.build_task(&self.name, n);
            let id = task.id();
            let description = task.to_string();

            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                result = self.queue.put(task) => match result {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(producer = %self.name, "Queue rejected task: {}", e);
                        false
                    }
                },
            };

            if !accepted {
                cancelled = true;
                warn!(producer = %self.name, "Producer interrupted while submitting task {}", description);
                break;
            }

            // A worker may already have taken the task and marked it PROCESSING
            self.statuses.set_if_absent(id, TaskStatus::Submitted);
            submitted += 1;
            debug!(producer = %self.name, "Submitted {}", description);

            if n < self.count {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        }

        info!(producer = %self.name, submitted, "Producer finished generating tasks");
        ProducerReport {
            name: self.name,
            submitted,
            cancelled,
        }
    }
}
