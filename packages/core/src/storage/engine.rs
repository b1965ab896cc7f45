//! The [`Store`] contract shared by every backend.

use crate::context::BatchContext;
use crate::error::{Result, StoreError};
use crate::types::{Pair, Value};

/// Key-value store contract.
///
/// All operations are synchronous and block on the backend's locks for
/// their full duration. Implementations are shared across callers as
/// `Arc<dyn Store>`; none of them is ever shared by value.
pub trait Store: Send + Sync + 'static {
    /// Short backend name used in logs and health output.
    fn name(&self) -> &'static str;

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key is absent.
    fn get(&self, key: &str) -> Result<Value>;

    /// Inserts or overwrites `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::StoreFull`] when a bounded backend would have to grow
    /// past its capacity to insert a new key. Overwrites never fail.
    fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Overwrites `key` only if it already exists.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key is absent; nothing is created.
    fn update(&self, key: &str, value: Value) -> Result<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Backend specific: the map backends treat an absent key as success,
    /// the LRU backend reports [`StoreError::NotFound`].
    fn delete(&self, key: &str) -> Result<()>;

    /// Applies update semantics to each pair in input order, skipping pairs
    /// whose key does not exist. Returns the pairs actually applied.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cancelled`] if `ctx` is cancelled before or during the
    /// batch. What happens to pairs applied before the cancellation was
    /// observed depends on the backend.
    fn batch_update(&self, ctx: &BatchContext, pairs: Vec<Pair>) -> Result<Vec<Pair>>;

    /// Queued batch updates are not offered: a job racing later gets and
    /// puts would make the store's state hard to reason about.
    ///
    /// # Errors
    ///
    /// Always [`StoreError::Unsupported`].
    fn batch_update_async(&self, _pairs: Vec<Pair>) -> Result<()> {
        Err(StoreError::Unsupported {
            operation: "batch_update_async",
        })
    }

    /// Number of entries currently stored.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
