//! `memkv` core: store contract, cancellation signal, and in-memory backends.
//!
//! Three interchangeable backends implement the same [`Store`] contract:
//!
//! - [`WriteOptimizedStore`]: one read-write lock over a map, atomic batches
//!   with snapshot rollback
//! - [`LruStore`]: fixed-capacity cache with O(1) recency eviction
//! - [`ShardedStore`]: hash-partitioned map with per-shard locking

pub mod context;
pub mod error;
pub mod hash;
pub mod storage;
pub mod types;

pub use context::BatchContext;
pub use error::{CancelCause, ConfigError, Result, StoreError};
pub use hash::{fnv1a_hash, shard_for_key};
pub use storage::{LruStore, ShardedStore, Store, StoreConfig, StoreKind, WriteOptimizedStore};
pub use types::{Pair, Value};
