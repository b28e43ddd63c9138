//! # concurq Work Queue
//!
//! Concurrent job-processing core.
//!
//! ## Features
//!
//! - Bounded priority queue with producer backpressure
//! - Worker pool with a pluggable lock-acquisition order over two shared resources
//! - Bounded retry with terminal failure
//! - Producers with priority classes
//! - Dispatcher owning the shared state and the shutdown sequence

pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod locks;
pub mod producer;
pub mod queue;
pub mod status;
pub mod task;
pub mod worker;

pub use concurq_config::MAX_RETRIES;
pub use dispatcher::{ShutdownReport, TaskDispatcher};
pub use error::{DispatchError, TaskError};
pub use handler::{SimulatedWork, TaskHandler};
pub use locks::{HeldLocks, LockOrder, ResourceGuard, ResourcePair, SharedResource, LOCK_TARGET};
pub use producer::{PriorityClass, ProducerReport, TaskProducer};
pub use queue::TaskQueue;
pub use status::{RetryCounts, StatusCounts, StatusStore};
pub use task::{Task, TaskStatus};
pub use worker::{PoolStats, TaskWorker, WorkerContext};
