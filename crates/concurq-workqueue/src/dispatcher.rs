//! Dispatcher: owns the queue, the worker pool and the shared bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use concurq_config::{DispatcherConfig, MAX_RETRIES};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::DispatchError;
use crate::handler::{SimulatedWork, TaskHandler};
use crate::locks::{LockOrder, ResourcePair};
use crate::producer::{ProducerReport, TaskProducer};
use crate::queue::TaskQueue;
use crate::status::{RetryCounts, StatusStore};
use crate::task::{Task, TaskStatus};
use crate::worker::{PoolStats, TaskWorker, WorkerContext};

/// How long shutdown waits for cancelled producers to return.
const PRODUCER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of [`TaskDispatcher::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Some workers were still running after the forced grace period.
    pub degraded: bool,
    /// Tasks left in the queue when the pool stopped, in dispatch order.
    pub drained: Vec<Task>,
    pub producers: Vec<ProducerReport>,
}

/// Composition root for the pipeline.
pub struct TaskDispatcher {
    config: DispatcherConfig,
    queue: Arc<TaskQueue>,
    statuses: Arc<StatusStore>,
    retries: Arc<RetryCounts>,
    processed: Arc<AtomicU64>,
    resources: Arc<ResourcePair>,
    stats: Arc<PoolStats>,
    handler: Arc<dyn TaskHandler>,
    lock_order: LockOrder,
    accepting: AtomicBool,
    /// Aborts in-flight tasks.
    interrupt: CancellationToken,
    /// Asks workers to exit between tasks. Child of `interrupt`.
    stop: CancellationToken,
    producer_cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
    workers_started: AtomicBool,
    producers: Mutex<Vec<JoinHandle<ProducerReport>>>,
}

impl TaskDispatcher {
    /// Create a dispatcher running [`SimulatedWork`].
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let handler = Arc::new(SimulatedWork::from_config(&config));
        Self::with_handler(config, handler)
    }

    /// Create a dispatcher with a custom task handler.
    pub fn with_handler(
        config: DispatcherConfig,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self, DispatchError> {
        validate(&config)?;

        let interrupt = CancellationToken::new();
        let stop = interrupt.child_token();
        let lock_order = LockOrder::from(config.lock_order);

        info!(
            workers = config.worker_pool_size,
            capacity = config.queue_capacity,
            lock_order = %lock_order,
            "Dispatcher created"
        );

        Ok(Self {
            queue: Arc::new(TaskQueue::new(config.queue_capacity)),
            statuses: Arc::new(StatusStore::new()),
            retries: Arc::new(RetryCounts::new()),
            processed: Arc::new(AtomicU64::new(0)),
            resources: Arc::new(ResourcePair::new()),
            stats: Arc::new(PoolStats::new()),
            handler,
            lock_order,
            accepting: AtomicBool::new(true),
            interrupt,
            stop,
            producer_cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
            workers_started: AtomicBool::new(false),
            producers: Mutex::new(Vec::new()),
            config,
        })
    }

    fn ensure_accepting(&self) -> Result<(), DispatchError> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DispatchError::ShuttingDown)
        }
    }

    fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            queue: self.queue.clone(),
            statuses: self.statuses.clone(),
            retries: self.retries.clone(),
            processed: self.processed.clone(),
            resources: self.resources.clone(),
            stats: self.stats.clone(),
            handler: self.handler.clone(),
            lock_order: self.lock_order,
            lock_hold: self.config.lock_hold,
            max_retries: self.config.max_retries,
        }
    }

    /// Spawn exactly `worker_pool_size` worker loops.
    pub fn start_workers(&self) -> Result<(), DispatchError> {
        self.ensure_accepting()?;
        if self.workers_started.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::WorkersAlreadyStarted);
        }

        let ctx = self.worker_context();
        let mut workers = self.workers.lock();
        for id in 1..=self.config.worker_pool_size {
            let worker = TaskWorker::new(id, ctx.clone());
            workers.push(tokio::spawn(
                worker.run(self.stop.clone(), self.interrupt.clone()),
            ));
        }

        info!(
            "Started {} workers (lock order: {})",
            self.config.worker_pool_size, self.lock_order
        );
        Ok(())
    }

    /// Spawn a producer submitting `count` tasks, one every `interval`.
    pub fn start_producer(
        &self,
        name: impl Into<String>,
        count: u32,
        interval: Duration,
    ) -> Result<(), DispatchError> {
        self.ensure_accepting()?;

        let producer = TaskProducer::new(
            name,
            count,
            interval,
            self.queue.clone(),
            self.statuses.clone(),
        );
        info!(producer = %producer.name(), count, "Starting producer");
        let handle = tokio::spawn(producer.run(self.producer_cancel.child_token()));
        self.producers.lock().push(handle);
        Ok(())
    }

    /// Wait for every producer started so far to finish.
    pub async fn join_producers(&self) -> Vec<ProducerReport> {
        let handles: Vec<_> = std::mem::take(&mut *self.producers.lock());
        collect_reports(join_all(handles).await)
    }

    /// Stop the pipeline.
    ///
    /// Producers are cancelled and workers asked to finish their current
    /// task. Workers still running after the graceful period are interrupted;
    /// if they outlive the forced period too the report is marked degraded and
    /// their handles are detached. Tasks still queued are drained and logged.
    /// Call once per dispatcher.
    pub async fn shutdown(&self) -> ShutdownReport {
        info!("Initiating dispatcher shutdown");
        let mut report = ShutdownReport::default();

        self.accepting.store(false, Ordering::SeqCst);
        self.producer_cancel.cancel();
        let producers: Vec<_> = std::mem::take(&mut *self.producers.lock());
        match tokio::time::timeout(PRODUCER_JOIN_TIMEOUT, join_all(producers)).await {
            Ok(results) => report.producers = collect_reports(results),
            Err(_) => warn!("Producers did not stop within {:?}", PRODUCER_JOIN_TIMEOUT),
        }

        self.stop.cancel();
        if !self.await_workers(self.config.graceful_timeout()).await {
            warn!(
                "Worker pool did not stop within {:?}, interrupting workers",
                self.config.graceful_timeout()
            );
            self.interrupt.cancel();

            if !self.await_workers(self.config.forced_timeout()).await {
                error!("Worker pool did not terminate");
                report.degraded = true;
            }
        }

        report.drained = self.queue.drain();
        for task in &report.drained {
            let status = self
                .statuses
                .get(&task.id())
                .unwrap_or(TaskStatus::Submitted);
            info!("Task {} was still in queue (Status: {})", task.short_id(), status);
        }

        let cleared = self.queue.clear();
        self.queue.close();
        info!(
            drained = report.drained.len(),
            cleared,
            degraded = report.degraded,
            "Dispatcher shut down"
        );
        report
    }

    /// Wait up to `limit` for every worker to exit. Returns true once none remain.
    async fn await_workers(&self, limit: Duration) -> bool {
        let mut handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return true;
        }

        let finished = tokio::time::timeout(limit, join_all(handles.iter_mut()))
            .await
            .is_ok();
        if finished {
            handles.clear();
        } else {
            handles.retain(|h| !h.is_finished());
        }

        let remaining = handles.is_empty();
        self.workers.lock().extend(handles);
        remaining
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn statuses(&self) -> &Arc<StatusStore> {
        &self.statuses
    }

    pub fn retry_counts(&self) -> &Arc<RetryCounts> {
        &self.retries
    }

    pub fn pool_stats(&self) -> &Arc<PoolStats> {
        &self.stats
    }

    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn lock_order(&self) -> LockOrder {
        self.lock_order
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

fn validate(config: &DispatcherConfig) -> Result<(), DispatchError> {
    if config.worker_pool_size == 0 {
        return Err(DispatchError::InvalidConfig(
            "worker_pool_size must be greater than 0".to_string(),
        ));
    }
    if config.queue_capacity == 0 {
        return Err(DispatchError::InvalidConfig(
            "queue_capacity must be greater than 0".to_string(),
        ));
    }
    if config.max_retries > MAX_RETRIES {
        return Err(DispatchError::InvalidConfig(format!(
            "max_retries cannot exceed {}",
            MAX_RETRIES
        )));
    }
    if !config.lock_hold.is_valid() || !config.processing_time.is_valid() {
        return Err(DispatchError::InvalidConfig(
            "duration range min_ms cannot be greater than max_ms".to_string(),
        ));
    }
    Ok(())
}

fn collect_reports(
    results: Vec<Result<ProducerReport, tokio::task::JoinError>>,
) -> Vec<ProducerReport> {
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Producer task failed: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
