//! Partition Locking
//!
//! Extension point for serializing read-modify-write cycles per
//! (table, partition key).
//!
//! The engine itself takes no locks. Two writers to the same partition race
//! and the later rewrite wins. An embedding system picks a `PartitionLock`:
//! - `NoPartitionLock`: baseline behavior, fine for a single writer
//! - `LocalPartitionLock`: one mutex per partition within this process
//! - its own implementation (file locks, a distributed lock service, ...)

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Held for the duration of one partition's read-modify-write
///
/// Dropping the guard releases whatever the lock implementation acquired.
pub struct PartitionGuard {
    _inner: Option<Box<dyn Any>>,
}

impl PartitionGuard {
    /// A guard that holds nothing
    pub fn unlocked() -> Self {
        Self { _inner: None }
    }

    /// Wrap an implementation-specific guard; it is dropped with this one
    pub fn new<G: 'static>(guard: G) -> Self {
        Self {
            _inner: Some(Box::new(guard)),
        }
    }
}

/// Per-partition mutual exclusion hook
pub trait PartitionLock: Send + Sync {
    /// Block until the partition is exclusively held by the caller
    fn lock(&self, table: &str, partition_key: &str) -> PartitionGuard;
}

/// No mutual exclusion (last rewrite wins)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPartitionLock;

impl PartitionLock for NoPartitionLock {
    fn lock(&self, _table: &str, _partition_key: &str) -> PartitionGuard {
        PartitionGuard::unlocked()
    }
}

type PartitionKey = (String, String);
type PartitionMap = HashMap<PartitionKey, Arc<Mutex<()>>>;

/// Process-local mutex per (table, partition key)
///
/// A mutex exists only while some caller holds or waits for it; the last
/// guard to be released removes it from the map.
#[derive(Default)]
pub struct LocalPartitionLock {
    partitions: Arc<Mutex<PartitionMap>>,
}

impl LocalPartitionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of partitions currently held or waited on
    pub fn tracked_partitions(&self) -> usize {
        self.partitions.lock().len()
    }
}

impl PartitionLock for LocalPartitionLock {
    fn lock(&self, table: &str, partition_key: &str) -> PartitionGuard {
        let key = (table.to_string(), partition_key.to_string());
        let mutex = {
            let mut partitions = self.partitions.lock();
            Arc::clone(partitions.entry(key.clone()).or_default())
        };

        // Map lock is released before blocking on the partition
        let held = mutex.lock_arc();
        PartitionGuard::new(LocalGuard {
            key,
            held: Some(held),
            partitions: Arc::clone(&self.partitions),
        })
    }
}

/// Releases the partition mutex, then drops its map entry if nobody else
/// references it
struct LocalGuard<G> {
    key: PartitionKey,
    held: Option<G>,
    partitions: Arc<Mutex<PartitionMap>>,
}

impl<G> Drop for LocalGuard<G> {
    fn drop(&mut self) {
        self.held.take();

        // Clones are only taken under the map lock, so a count of one here
        // means no waiter can still reach this mutex
        let mut partitions = self.partitions.lock();
        if partitions
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            partitions.remove(&self.key);
        }
    }
}
