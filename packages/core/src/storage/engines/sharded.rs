//! Hash-partitioned [`Store`] backend backed by one [`DashMap`] per shard.
//!
//! Keys are routed with [`shard_for_key`], so a key maps to the same shard
//! for the lifetime of the store. Each shard is internally concurrent;
//! operations on different shards never contend. There is no cross-shard
//! atomicity: a batch cancelled partway leaves earlier pairs applied.

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::context::BatchContext;
use crate::error::{Result, StoreError};
use crate::hash::shard_for_key;
use crate::storage::engine::Store;
use crate::types::{Pair, Value};

/// Default number of shards.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Sharded concurrent map backend.
#[derive(Debug)]
pub struct ShardedStore {
    shards: Vec<DashMap<String, Value>>,
}

impl ShardedStore {
    /// Creates a store with [`DEFAULT_SHARD_COUNT`] shards.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shard_count(DEFAULT_SHARD_COUNT)
    }

    /// Creates a store with `count` shards. Zero is treated as one.
    #[must_use]
    pub fn with_shard_count(count: usize) -> Self {
        let count = count.max(1);
        let shards = (0..count).map(|_| DashMap::new()).collect();
        info!("ShardedStore initialized with {} shards", count);
        Self { shards }
    }

    /// Number of shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard `key` routes to.
    #[must_use]
    pub fn shard_index(&self, key: &str) -> usize {
        shard_for_key(key, self.shards.len())
    }

    fn shard(&self, key: &str) -> &DashMap<String, Value> {
        &self.shards[self.shard_index(key)]
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for ShardedStore {
    fn name(&self) -> &'static str {
        "sharded"
    }

    fn get(&self, key: &str) -> Result<Value> {
        self.shard(key)
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        self.shard(key).insert(key.to_string(), value);
        Ok(())
    }

    fn update(&self, key: &str, value: Value) -> Result<()> {
        match self.shard(key).get_mut(key) {
            Some(mut slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.shard(key).remove(key);
        Ok(())
    }

    fn batch_update(&self, ctx: &BatchContext, pairs: Vec<Pair>) -> Result<Vec<Pair>> {
        let requested = pairs.len();
        let mut applied = Vec::with_capacity(requested);
        for pair in pairs {
            if let Err(err) = ctx.check() {
                warn!(
                    store = "sharded",
                    requested,
                    applied = applied.len(),
                    "batch cancelled, applied pairs kept: {err}"
                );
                return Err(err);
            }
            // The entry guard makes the exists-check and the write one step.
            if let Some(mut slot) = self.shard(&pair.key).get_mut(&pair.key) {
                *slot = pair.value.clone();
                drop(slot);
                applied.push(pair);
            }
        }
        debug!(store = "sharded", requested, applied = applied.len(), "batch applied");
        Ok(applied)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(DashMap::len).sum()
    }
}
