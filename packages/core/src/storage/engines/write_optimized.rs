//! Single-lock [`Store`] backend with atomic, rollback-capable batches.
//!
//! One [`parking_lot::RwLock`] guards a plain `HashMap`. Reads share the
//! lock; every mutation, including a whole batch, holds it exclusively, so
//! a batch appears atomic to every other caller.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, warn};

use super::{check_due, DEFAULT_CHECK_INTERVAL};
use crate::context::BatchContext;
use crate::error::{Result, StoreError};
use crate::storage::engine::Store;
use crate::types::{Pair, Value};

/// Map backend tuned for write throughput and batch atomicity.
///
/// - `capacity`: optional entry limit; inserting a new key at the limit
///   fails with [`StoreError::StoreFull`]
/// - `rollback`: restore pre-batch values when a batch is cancelled
/// - `check_interval`: batch iterations between cancellation checks
#[derive(Debug)]
pub struct WriteOptimizedStore {
    entries: RwLock<HashMap<String, Value>>,
    capacity: Option<usize>,
    rollback: bool,
    check_interval: usize,
}

impl WriteOptimizedStore {
    /// Creates an unbounded store with rollback enabled, checking
    /// cancellation on every batch iteration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: None,
            rollback: true,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Limits the store to `capacity` entries.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Enables or disables batch rollback on cancellation.
    #[must_use]
    pub fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    /// Sets how many batch iterations pass between cancellation checks.
    /// Zero is treated as one.
    #[must_use]
    pub fn with_check_interval(mut self, interval: usize) -> Self {
        self.check_interval = interval.max(1);
        self
    }

    /// The configured entry limit, if any.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Whether cancelled batches are rolled back.
    #[must_use]
    pub fn rollback_enabled(&self) -> bool {
        self.rollback
    }

    /// Runs the batch loop under the write lock.
    ///
    /// `poll` is consulted on every due iteration; the first error it
    /// returns stops the batch and, with rollback enabled, restores every
    /// key the batch touched before the lock is released.
    fn apply_batch<F>(&self, pairs: Vec<Pair>, mut poll: F) -> Result<Vec<Pair>>
    where
        F: FnMut() -> Result<()>,
    {
        let entries = self.entries.write();
        let snapshot = self.rollback.then(|| snapshot_of(&entries, &pairs));
        let mut batch = BatchGuard { entries, snapshot };

        let requested = pairs.len();
        let mut applied = Vec::with_capacity(requested);
        for (i, pair) in pairs.into_iter().enumerate() {
            if check_due(i, self.check_interval) {
                if let Err(err) = poll() {
                    warn!(
                        store = "write-optimized",
                        requested,
                        applied = applied.len(),
                        rollback = self.rollback,
                        "batch cancelled: {err}"
                    );
                    // Dropping `batch` restores the snapshot.
                    return Err(err);
                }
            }
            if let Some(slot) = batch.entries.get_mut(&pair.key) {
                slot.clone_from(&pair.value);
                applied.push(pair);
            }
        }

        batch.commit();
        debug!(
            store = "write-optimized",
            requested,
            applied = applied.len(),
            "batch applied"
        );
        Ok(applied)
    }
}

impl Default for WriteOptimizedStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-batch values of every key in `pairs` that currently exists.
///
/// Absent keys are skipped by the batch and need no snapshot.
fn snapshot_of(entries: &HashMap<String, Value>, pairs: &[Pair]) -> HashMap<String, Value> {
    pairs
        .iter()
        .filter_map(|pair| {
            entries
                .get(&pair.key)
                .map(|value| (pair.key.clone(), value.clone()))
        })
        .collect()
}

/// Write guard plus the batch snapshot.
///
/// The snapshot is written back when the guard drops, which happens on
/// every exit from the locked region: cancellation, an unwinding panic, or
/// any early return. Only [`commit`](BatchGuard::commit) discards it. The
/// restore always runs before the lock is released.
struct BatchGuard<'a> {
    entries: RwLockWriteGuard<'a, HashMap<String, Value>>,
    snapshot: Option<HashMap<String, Value>>,
}

impl BatchGuard<'_> {
    fn commit(mut self) {
        self.snapshot = None;
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            let restored = snapshot.len();
            for (key, value) in snapshot {
                self.entries.insert(key, value);
            }
            warn!(store = "write-optimized", restored, "batch rolled back");
        }
    }
}

impl Store for WriteOptimizedStore {
    fn name(&self) -> &'static str {
        "write-optimized"
    }

    fn get(&self, key: &str) -> Result<Value> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write();
        if let Some(slot) = entries.get_mut(key) {
            *slot = value;
            return Ok(());
        }
        if self.capacity.is_some_and(|cap| entries.len() >= cap) {
            return Err(StoreError::StoreFull);
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn update(&self, key: &str, value: Value) -> Result<()> {
        match self.entries.write().get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn batch_update(&self, ctx: &BatchContext, pairs: Vec<Pair>) -> Result<Vec<Pair>> {
        // Refuse before touching the lock if the caller already gave up.
        ctx.check()?;
        self.apply_batch(pairs, || ctx.check())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
