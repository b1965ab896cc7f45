//! Builds the backend selected at startup.
//!
//! [`StoreConfig`] is the single injection point: callers pick a
//! [`StoreKind`] plus tuning knobs and receive an `Arc<dyn Store>` they can
//! hand to any transport. Nothing downstream depends on backend-specific
//! fields.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use super::engines::sharded::DEFAULT_SHARD_COUNT;
use super::engines::{LruStore, ShardedStore, WriteOptimizedStore, DEFAULT_CHECK_INTERVAL};
use super::engine::Store;
use crate::error::ConfigError;

/// Which backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// [`WriteOptimizedStore`]
    WriteOptimized,
    /// [`LruStore`]
    Lru,
    /// [`ShardedStore`]
    Sharded,
}

impl StoreKind {
    /// Stable lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::WriteOptimized => "write-optimized",
            StoreKind::Lru => "lru",
            StoreKind::Sharded => "sharded",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "write-optimized" | "write_optimized" | "map" => Ok(StoreKind::WriteOptimized),
            "lru" => Ok(StoreKind::Lru),
            "sharded" => Ok(StoreKind::Sharded),
            _ => Err(format!("'{s}' is not a valid store kind")),
        }
    }
}

/// Fixed configuration a backend is created with.
///
/// Fields that do not apply to the chosen kind are ignored:
/// `rollback` only affects the write-optimized store, `shard_count` only
/// the sharded one, and the sharded store is unbounded.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend to build.
    pub kind: StoreKind,
    /// Entry limit. Required for the LRU store; `None` leaves the
    /// write-optimized store unbounded.
    pub capacity: Option<usize>,
    /// Restore pre-batch values when a write-optimized batch is cancelled.
    pub rollback: bool,
    /// Batch iterations between cancellation checks. Clamped to at least 1.
    pub check_interval: usize,
    /// Number of shards for the sharded store. Clamped to at least 1.
    pub shard_count: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::WriteOptimized,
            capacity: Some(100),
            rollback: true,
            check_interval: DEFAULT_CHECK_INTERVAL,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

impl StoreConfig {
    /// Creates the configured backend.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnboundedLru`] if `kind` is LRU and no capacity is set
    /// - [`ConfigError::ZeroCapacity`] if an LRU capacity of zero is given
    pub fn build(&self) -> Result<Arc<dyn Store>, ConfigError> {
        let store: Arc<dyn Store> = match self.kind {
            StoreKind::WriteOptimized => {
                let mut store = WriteOptimizedStore::new()
                    .with_rollback(self.rollback)
                    .with_check_interval(self.check_interval);
                if let Some(capacity) = self.capacity {
                    store = store.with_capacity(capacity);
                }
                Arc::new(store)
            }
            StoreKind::Lru => {
                let capacity = self.capacity.ok_or(ConfigError::UnboundedLru)?;
                let capacity = NonZeroUsize::new(capacity).ok_or(ConfigError::ZeroCapacity)?;
                Arc::new(LruStore::new(capacity).with_check_interval(self.check_interval))
            }
            StoreKind::Sharded => Arc::new(ShardedStore::with_shard_count(self.shard_count)),
        };

        info!(
            kind = %self.kind,
            capacity = ?self.capacity,
            rollback = self.rollback,
            check_interval = self.check_interval,
            "store created"
        );
        Ok(store)
    }
}
