//! Shared resources and lock-acquisition order.

use std::sync::Arc;

use concurq_config::LockOrderMode;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::task::Task;

/// Tracing target for lock acquire/release lines.
pub const LOCK_TARGET: &str = "concurq::lock";

/// A named exclusive resource shared by every worker in the pool.
#[derive(Debug)]
pub struct SharedResource {
    name: &'static str,
    lock: Mutex<()>,
}

impl SharedResource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for exclusive access. Dropping the guard releases it.
    pub async fn acquire(&self) -> ResourceGuard<'_> {
        let guard = self.lock.lock().await;
        ResourceGuard {
            name: self.name,
            _guard: guard,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// Exclusive access to a [`SharedResource`].
pub struct ResourceGuard<'a> {
    name: &'static str,
    _guard: MutexGuard<'a, ()>,
}

impl ResourceGuard<'_> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The two resources contended for by the pool.
#[derive(Debug)]
pub struct ResourcePair {
    pub a: Arc<SharedResource>,
    pub b: Arc<SharedResource>,
}

impl ResourcePair {
    pub fn new() -> Self {
        Self {
            a: Arc::new(SharedResource::new("LOCK_A")),
            b: Arc::new(SharedResource::new("LOCK_B")),
        }
    }
}

impl Default for ResourcePair {
    fn default() -> Self {
        Self::new()
    }
}

/// Order in which a worker acquires the resource pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockOrder {
    /// A then B for every task. Cannot deadlock.
    #[default]
    Fixed,
    /// Even task ids take A then B, odd ids take B then A.
    Conflicting,
}

impl LockOrder {
    /// Resources in the order they must be acquired for `task`.
    pub fn sequence<'a>(&self, task: &Task, pair: &'a ResourcePair) -> [&'a SharedResource; 2] {
        match self {
            LockOrder::Fixed => [&*pair.a, &*pair.b],
            LockOrder::Conflicting if task.id().as_u128() & 1 == 0 => [&*pair.a, &*pair.b],
            LockOrder::Conflicting => [&*pair.b, &*pair.a],
        }
    }
}

impl From<LockOrderMode> for LockOrder {
    fn from(mode: LockOrderMode) -> Self {
        match mode {
            LockOrderMode::Fixed => LockOrder::Fixed,
            LockOrderMode::Conflicting => LockOrder::Conflicting,
        }
    }
}

impl std::fmt::Display for LockOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockOrder::Fixed => write!(f, "fixed"),
            LockOrder::Conflicting => write!(f, "conflicting"),
        }
    }
}

/// The lock set held by one worker for one task.
///
/// Guards are released in reverse acquisition order when this value is
/// dropped, whichever way the attempt ends.
pub struct HeldLocks<'a> {
    owner: String,
    guards: Vec<ResourceGuard<'a>>,
}

impl<'a> HeldLocks<'a> {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            guards: Vec::with_capacity(2),
        }
    }

    pub fn push(&mut self, guard: ResourceGuard<'a>) {
        self.guards.push(guard);
    }

    /// Names of the held resources in acquisition order.
    pub fn names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }
}

impl Drop for HeldLocks<'_> {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            let name = guard.name();
            drop(guard);
            debug!(target: LOCK_TARGET, "{} released {}", self.owner, name);
        }
    }
}
