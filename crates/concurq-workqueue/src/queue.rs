//! Bounded priority queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::DispatchError;
use crate::task::Task;

/// Heap entry. `seq` breaks ties between tasks created at the same instant.
struct QueuedTask {
    task: Task,
    seq: u64,
    /// Whether this entry occupies a capacity slot. Retries do not.
    holds_slot: bool,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest entry, so invert the dispatch order
        other
            .task
            .dispatch_cmp(&self.task)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Bounded, priority-ordered, blocking task queue.
///
/// `slots` counts free capacity and `items` counts resident entries. Both are
/// taken with `forget` and given back with `add_permits`, so every suspension
/// point is a single semaphore acquire and dropping a pending `put` or `take`
/// leaves the queue untouched.
pub struct TaskQueue {
    capacity: usize,
    heap: Mutex<BinaryHeap<QueuedTask>>,
    slots: Semaphore,
    items: Semaphore,
    next_seq: AtomicU64,
}

impl TaskQueue {
    /// Create a queue holding at most `capacity` producer-submitted tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: Mutex::new(BinaryHeap::with_capacity(capacity)),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Enqueue a task, waiting while the queue is full.
    pub async fn put(&self, task: Task) -> Result<(), DispatchError> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| DispatchError::QueueClosed)?;
        permit.forget();
        self.push(task, true);
        Ok(())
    }

    /// Re-admit a task for another attempt without waiting for capacity.
    pub fn requeue(&self, task: Task) {
        self.push(task, false);
    }

    fn push(&self, task: Task, holds_slot: bool) {
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::SeqCst);
        debug!(task_id = %task.short_id(), priority = task.priority(), "Enqueueing task");
        self.heap.lock().push(QueuedTask {
            task,
            seq,
            holds_slot,
        });
        self.items.add_permits(1);
    }

    /// Dequeue the next task in dispatch order, waiting while the queue is empty.
    pub async fn take(&self) -> Result<Task, DispatchError> {
        loop {
            let permit = self
                .items
                .acquire()
                .await
                .map_err(|_| DispatchError::QueueClosed)?;
            permit.forget();
            if let Some(task) = self.pop() {
                return Ok(task);
            }
        }
    }

    fn pop(&self) -> Option<Task> {
        let entry = self.heap.lock().pop()?;
        if entry.holds_slot {
            self.slots.add_permits(1);
        }
        Some(entry.task)
    }

    /// Remove and return every resident task in dispatch order.
    ///
    /// Works on a closed queue too.
    pub fn drain(&self) -> Vec<Task> {
        let entries: Vec<QueuedTask> = {
            let mut heap = self.heap.lock();
            std::iter::from_fn(|| heap.pop()).collect()
        };

        let mut drained = Vec::with_capacity(entries.len());
        for entry in entries {
            // A taker that already holds this item's permit will find the heap empty and retry
            if let Ok(permit) = self.items.try_acquire() {
                permit.forget();
            }
            if entry.holds_slot {
                self.slots.add_permits(1);
            }
            drained.push(entry.task);
        }
        drained
    }

    /// Discard every resident task, returning how many were removed.
    pub fn clear(&self) -> usize {
        self.drain().len()
    }

    /// Wake every waiter with [`DispatchError::QueueClosed`] and reject new work.
    pub fn close(&self) {
        self.slots.close();
        self.items.close();
    }

    pub fn is_closed(&self) -> bool {
        self.items.is_closed()
    }

    /// Number of resident tasks. May exceed `capacity` by the number of pending retries.
    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
