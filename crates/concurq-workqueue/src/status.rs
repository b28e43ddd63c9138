//! Per-task status and retry bookkeeping.

use std::fmt;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::task::TaskStatus;

/// Concurrent task-id -> status map.
#[derive(Debug, Default)]
pub struct StatusStore {
    statuses: DashMap<Uuid, TaskStatus>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: Uuid, status: TaskStatus) {
        self.statuses.insert(id, status);
    }

    /// Record `status` unless the task already has one. Returns true when inserted.
    pub fn set_if_absent(&self, id: Uuid, status: TaskStatus) -> bool {
        match self.statuses.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(status);
                true
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<TaskStatus> {
        self.statuses.get(id).map(|entry| *entry.value())
    }

    pub fn remove(&self, id: &Uuid) -> Option<TaskStatus> {
        self.statuses.remove(id).map(|(_, status)| status)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Number of tasks currently in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.statuses.iter().filter(|e| *e.value() == status).count()
    }

    /// Aggregated per-status counts.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.statuses.iter() {
            counts.record(*entry.value());
        }
        counts
    }

    /// Copy of every entry. Each entry is read atomically; the copy as a whole is not.
    pub fn entries(&self) -> Vec<(Uuid, TaskStatus)> {
        self.statuses
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// True when every tracked task has reached a terminal status.
    pub fn all_terminal(&self) -> bool {
        self.statuses.iter().all(|e| e.value().is_terminal())
    }
}

/// Per-status task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub submitted: usize,
    pub processing: usize,
    pub completed: usize,
    pub retry_pending: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: TaskStatus) {
        *self.slot(status) += 1;
    }

    fn slot(&mut self, status: TaskStatus) -> &mut usize {
        match status {
            TaskStatus::Submitted => &mut self.submitted,
            TaskStatus::Processing => &mut self.processing,
            TaskStatus::Completed => &mut self.completed,
            TaskStatus::RetryPending => &mut self.retry_pending,
            TaskStatus::Failed => &mut self.failed,
        }
    }

    pub fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Submitted => self.submitted,
            TaskStatus::Processing => self.processing,
            TaskStatus::Completed => self.completed,
            TaskStatus::RetryPending => self.retry_pending,
            TaskStatus::Failed => self.failed,
        }
    }

    pub fn total(&self) -> usize {
        self.submitted + self.processing + self.completed + self.retry_pending + self.failed
    }
}

/// `SUBMITTED:3 PROCESSING:2`, omitting zero counts.
impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = TaskStatus::ALL
            .iter()
            .filter(|s| self.get(**s) > 0)
            .map(|s| format!("{}:{}", s, self.get(*s)))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Dispatcher-owned retry attempt counts. An entry exists only while a task
/// is inside the retry cycle.
#[derive(Debug, Default)]
pub struct RetryCounts {
    counts: DashMap<Uuid, u32>,
}

impl RetryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries so far; zero when the task has never failed.
    pub fn get(&self, id: &Uuid) -> u32 {
        self.counts.get(id).map(|c| *c.value()).unwrap_or(0)
    }

    /// Record one more retry and return the new count.
    pub fn increment(&self, id: Uuid) -> u32 {
        let mut entry = self.counts.entry(id).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Remove the entry once the task leaves the retry cycle.
    pub fn clear(&self, id: &Uuid) {
        self.counts.remove(id);
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.counts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
