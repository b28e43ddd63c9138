//! Worker loop and pool statistics.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use concurq_config::MillisRange;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::TaskError;
use crate::handler::{TaskHandler, pick_duration};
use crate::locks::{HeldLocks, LOCK_TARGET, LockOrder, ResourcePair};
use crate::queue::TaskQueue;
use crate::status::{RetryCounts, StatusStore};
use crate::task::{Task, TaskStatus};

/// Pool-wide worker counters.
///
/// A worker is *active* while it owns a task and is not waiting for a lock,
/// so a pool stuck in circular lock wait reports zero active workers.
#[derive(Debug, Default)]
pub struct PoolStats {
    live: AtomicUsize,
    active: AtomicUsize,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker loops currently running.
    pub fn total(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::SeqCst)
    }

    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed.load(Ordering::SeqCst)
    }

    fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failed(&self) {
        self.tasks_failed.fetch_add(1, Ordering::SeqCst);
    }

    fn enter_live(&self) -> CounterGuard<'_> {
        CounterGuard::increment(&self.live)
    }

    fn enter_active(&self) -> CounterGuard<'_> {
        CounterGuard::increment(&self.active)
    }

    fn begin_lock_wait(&self) -> LockWaitGuard<'_> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        LockWaitGuard(&self.active)
    }
}

/// Holds a counter incremented for its lifetime.
struct CounterGuard<'a>(&'a AtomicUsize);

impl<'a> CounterGuard<'a> {
    fn increment(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for CounterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Marks an active worker as blocked on a lock until dropped.
struct LockWaitGuard<'a>(&'a AtomicUsize);

impl Drop for LockWaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared state handed to every worker in the pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<TaskQueue>,
    pub statuses: Arc<StatusStore>,
    pub retries: Arc<RetryCounts>,
    /// Tasks completed across the whole pool.
    pub processed: Arc<AtomicU64>,
    pub resources: Arc<ResourcePair>,
    pub stats: Arc<PoolStats>,
    pub handler: Arc<dyn TaskHandler>,
    pub lock_order: LockOrder,
    /// Delay between acquiring the first and attempting the second lock.
    pub lock_hold: MillisRange,
    pub max_retries: u32,
}

/// A single worker loop.
pub struct TaskWorker {
    id: usize,
    ctx: WorkerContext,
}

impl TaskWorker {
    pub fn new(id: usize, ctx: WorkerContext) -> Self {
        Self { id, ctx }
    }

    fn owner(&self) -> String {
        format!("Worker-{}", self.id)
    }

    /// Take and process tasks until `stop` is cancelled or the queue closes.
    ///
    /// `stop` is observed only between tasks. `interrupt` aborts the task in
    /// flight, marks it FAILED and ends the loop.
    pub async fn run(self, stop: CancellationToken, interrupt: CancellationToken) {
        let _live = self.ctx.stats.enter_live();
        info!(worker_id = self.id, "Worker started");

        loop {
            let task = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                taken = self.ctx.queue.take() => match taken {
                    Ok(task) => task,
                    Err(_) => break,
                },
            };

            if !self.process(task, &interrupt).await {
                break;
            }
        }

        info!(worker_id = self.id, "Worker stopped");
    }

    /// Returns false when the worker was interrupted.
    async fn process(&self, task: Task, interrupt: &CancellationToken) -> bool {
        let _active = self.ctx.stats.enter_active();
        let id = task.id();
        let short_id = task.short_id();

        self.ctx.statuses.set(id, TaskStatus::Processing);
        info!(worker_id = self.id, task_id = %short_id, "Processing {}", task);

        let finished = tokio::select! {
            biased;
            _ = interrupt.cancelled() => false,
            _ = self.attempt(task) => true,
        };

        if !finished {
            self.ctx.statuses.set(id, TaskStatus::Failed);
            self.ctx.retries.clear(&id);
            self.ctx.stats.record_failed();
            error!(worker_id = self.id, task_id = %short_id, "Worker interrupted, task marked FAILED");
        }
        finished
    }

    /// One attempt: take the lock set, run the handler and resolve the outcome
    /// before the locks are released.
    async fn attempt(&self, task: Task) {
        let owner = self.owner();
        let mut held = HeldLocks::new(owner.clone());

        for (i, resource) in self
            .ctx
            .lock_order
            .sequence(&task, &self.ctx.resources)
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                tokio::time::sleep(pick_duration(self.ctx.lock_hold)).await;
            }
            debug!(
                target: LOCK_TARGET,
                "{} attempting {} for task {}",
                owner,
                resource.name(),
                task.short_id()
            );
            let guard = {
                let _waiting = self.ctx.stats.begin_lock_wait();
                resource.acquire().await
            };
            debug!(target: LOCK_TARGET, "{} acquired {}", owner, resource.name());
            held.push(guard);
        }

        let result = match AssertUnwindSafe(self.ctx.handler.handle(&task))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(TaskError::Fatal(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        self.resolve(task, result);
        drop(held);
    }

    fn resolve(&self, task: Task, result: Result<(), TaskError>) {
        let id = task.id();
        let short_id = task.short_id();

        match result {
            Ok(()) => {
                self.ctx.statuses.set(id, TaskStatus::Completed);
                let total = self.ctx.processed.fetch_add(1, Ordering::SeqCst) + 1;
                self.ctx.retries.clear(&id);
                self.ctx.stats.record_completed();
                info!(
                    worker_id = self.id,
                    task_id = %short_id,
                    "Completed {} (total processed: {})",
                    task.name(),
                    total
                );
            }
            Err(TaskError::Transient(reason)) if self.ctx.retries.get(&id) < self.ctx.max_retries => {
                let attempt = self.ctx.retries.increment(id);
                self.ctx.statuses.set(id, TaskStatus::RetryPending);
                warn!(
                    worker_id = self.id,
                    task_id = %short_id,
                    "{} failed: {}. Retrying ({}/{})",
                    task.name(),
                    reason,
                    attempt,
                    self.ctx.max_retries
                );
                self.ctx.queue.requeue(task);
            }
            Err(TaskError::Transient(reason)) => {
                self.fail(&task);
                error!(
                    worker_id = self.id,
                    task_id = %short_id,
                    "{} failed: {}. Max retries reached. Task abandoned.",
                    task.name(),
                    reason
                );
            }
            Err(TaskError::Fatal(reason)) => {
                self.fail(&task);
                error!(
                    worker_id = self.id,
                    task_id = %short_id,
                    "Unexpected error processing {}: {}",
                    task.name(),
                    reason
                );
            }
        }
    }

    fn fail(&self, task: &Task) {
        self.ctx.statuses.set(task.id(), TaskStatus::Failed);
        self.ctx.retries.clear(&task.id());
        self.ctx.stats.record_failed();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
