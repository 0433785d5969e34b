//! Per-aggregate write locks
//!
//! Every handler that mutates an aggregate holds that aggregate's lock from the
//! `find` to the `save`, so two completions of the same batch always see each
//! other's writes. Different aggregates never block each other. An entry lives
//! only while someone holds or waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Single-writer locks keyed by aggregate id
#[derive(Debug, Default)]
pub struct AggregateLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the aggregate stored under `key`
    pub async fn acquire(&self, key: &str) -> AggregateGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        AggregateGuard {
            guard: Some(lock.lock_owned().await),
            key: key.to_string(),
            locks: self,
        }
    }

    /// Drops the entry of `key` once nobody holds or waits for it
    ///
    /// Clones of the entry are only taken under the map lock, so a strong
    /// count of one here means no other task can still reach it.
    fn release(&self, key: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    /// Number of aggregates currently locked or awaited
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one aggregate, released on drop
#[derive(Debug)]
pub struct AggregateGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: &'a AggregateLocks,
}

impl Drop for AggregateGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the guard's own reference is gone before the count check
        drop(self.guard.take());
        self.locks.release(&self.key);
    }
}
