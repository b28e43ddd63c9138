//! Point-in-time copy of the status store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use concurq_workqueue::{StatusStore, TaskStatus};
use serde::{Deserialize, Serialize};

/// Exported document: `{export_timestamp, total_tasks, task_statuses}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// ISO-8601 time the snapshot was taken.
    pub export_timestamp: DateTime<Utc>,
    pub total_tasks: usize,
    /// Task id to status name.
    pub task_statuses: BTreeMap<String, TaskStatus>,
}

impl StatusSnapshot {
    /// Copy every entry of `store`. Entries written during the copy may or may
    /// not be included.
    pub fn from_store(store: &StatusStore) -> Self {
        let task_statuses: BTreeMap<String, TaskStatus> = store
            .entries()
            .into_iter()
            .map(|(id, status)| (id.to_string(), status))
            .collect();

        Self {
            export_timestamp: Utc::now(),
            total_tasks: task_statuses.len(),
            task_statuses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.task_statuses.is_empty()
    }

    /// Number of tasks in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.task_statuses.values().filter(|s| **s == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_snapshot_matches_store() {
        let store = StatusStore::new();
        let mut expected = BTreeMap::new();
        for (status, n) in [
            (TaskStatus::Submitted, 3),
            (TaskStatus::Processing, 2),
            (TaskStatus::Completed, 5),
        ] {
            for _ in 0..n {
                let id = Uuid::new_v4();
                store.set(id, status);
                expected.insert(id.to_string(), status);
            }
        }

        let snapshot = StatusSnapshot::from_store(&store);
        assert_eq!(snapshot.total_tasks, 10);
        assert_eq!(snapshot.task_statuses, expected);
        assert_eq!(snapshot.count(TaskStatus::Processing), 2);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let store = StatusStore::new();
        let id = Uuid::new_v4();
        store.set(id, TaskStatus::RetryPending);

        let json = serde_json::to_value(StatusSnapshot::from_store(&store)).unwrap();
        assert_eq!(json["total_tasks"], 1);
        assert_eq!(json["task_statuses"][id.to_string()], "RETRY_PENDING");
        assert!(json["export_timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StatusSnapshot::from_store(&StatusStore::new());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_tasks, 0);
    }
}
