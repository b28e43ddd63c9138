//! Task definition and status.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task status.
///
/// `Submitted -> Processing -> {Completed | RetryPending -> Processing | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Accepted by a producer.
    Submitted,
    /// Owned by a worker.
    Processing,
    /// Completed successfully.
    Completed,
    /// Failed, waiting in the queue for another attempt.
    RetryPending,
    /// Failed permanently.
    Failed,
}

impl TaskStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Submitted,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::RetryPending,
        TaskStatus::Failed,
    ];

    /// No further transitions occur from a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Submitted => "SUBMITTED",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::RetryPending => "RETRY_PENDING",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work. Immutable once built; retry state lives in
/// [`RetryCounts`](crate::status::RetryCounts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    id: Uuid,
    name: String,
    /// Lower value means higher priority.
    priority: i32,
    created_at: DateTime<Utc>,
    payload: String,
}

impl Task {
    /// Create a new task stamped with the current time.
    pub fn new(name: impl Into<String>, priority: i32, payload: impl Into<String>) -> Self {
        Self::from_parts(Uuid::new_v4(), name, priority, Utc::now(), payload)
    }

    /// Build a task from explicit parts.
    pub fn from_parts(
        id: Uuid,
        name: impl Into<String>,
        priority: i32,
        created_at: DateTime<Utc>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            created_at,
            payload: payload.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// First eight characters of the id, for log lines.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Dispatch order: ascending priority, then ascending creation time.
    /// `Less` means `self` is dequeued first.
    pub fn dispatch_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task[id={}, name='{}', priority={}]",
            self.short_id(),
            self.name,
            self.priority
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new("test", 5, "payload");
        assert_eq!(task.name(), "test");
        assert_eq!(task.priority(), 5);
        assert_eq!(task.payload(), "payload");
        assert_eq!(task.short_id().len(), 8);
    }

    #[test]
    fn test_distinct_ids_for_identical_payload() {
        let a = Task::new("same", 1, "same");
        let b = Task::new("same", 1, "same");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_dispatch_cmp_priority_first() {
        let now = Utc::now();
        let urgent = Task::from_parts(Uuid::new_v4(), "urgent", 1, now, "");
        let routine =
            Task::from_parts(Uuid::new_v4(), "routine", 7, now - chrono::Duration::seconds(5), "");
        assert_eq!(urgent.dispatch_cmp(&routine), Ordering::Less);
        assert_eq!(routine.dispatch_cmp(&urgent), Ordering::Greater);
    }

    #[test]
    fn test_dispatch_cmp_ties_by_creation_time() {
        let now = Utc::now();
        let older = Task::from_parts(Uuid::new_v4(), "older", 3, now, "");
        let newer =
            Task::from_parts(Uuid::new_v4(), "newer", 3, now + chrono::Duration::milliseconds(1), "");
        assert_eq!(older.dispatch_cmp(&newer), Ordering::Less);
    }

    #[test]
    fn test_status_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::RetryPending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(!TaskStatus::Submitted.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::RetryPending.to_string(), "RETRY_PENDING");
        assert_eq!(TaskStatus::Processing.to_string(), "PROCESSING");
    }
}
