//! Fixed-capacity least-recently-used cache implementing [`Store`].
//!
//! Entries live in an index-linked arena list (front = most recently used)
//! with a `HashMap` from key to arena slot, giving O(1) get, put, and evict.
//! `get` reorders the list, so every operation, reads included, takes the
//! one exclusive lock.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{check_due, DEFAULT_CHECK_INTERVAL};
use crate::context::BatchContext;
use crate::error::{Result, StoreError};
use crate::storage::engine::Store;
use crate::types::{Pair, Value};

/// One arena slot. Free slots keep an empty key and a `Null` value.
#[derive(Debug)]
struct Node {
    key: String,
    value: Value,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency-ordered entries plus their index.
///
/// Invariant: every key in `index` names exactly one linked node, every
/// linked node is in `index`, and `index.len() <= capacity`.
#[derive(Debug)]
struct RecencyList {
    index: HashMap<String, usize>,
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
    capacity: usize,
}

impl RecencyList {
    fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            index: HashMap::new(),
            nodes: Vec::new(),
            head: None,
            tail: None,
            free: Vec::new(),
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    /// Looks up `key` and marks it most recently used.
    fn get(&mut self, key: &str) -> Option<&Value> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        Some(&self.nodes[idx].value)
    }

    /// Overwrites an existing key and marks it most recently used.
    /// Returns `false` if the key is absent.
    fn update(&mut self, key: &str, value: Value) -> bool {
        let Some(&idx) = self.index.get(key) else {
            return false;
        };
        self.nodes[idx].value = value;
        self.move_to_front(idx);
        true
    }

    /// Upserts `key` at the front, evicting the back entry first when a new
    /// key would exceed capacity. Returns the evicted key, if any.
    fn put(&mut self, key: &str, value: Value) -> Option<String> {
        if let Some(&idx) = self.index.get(key) {
            self.nodes[idx].value = value;
            self.move_to_front(idx);
            return None;
        }
        let evicted = if self.len() >= self.capacity {
            self.pop_back()
        } else {
            None
        };
        let idx = self.allocate(key.to_string(), value);
        self.link_front(idx);
        self.index.insert(key.to_string(), idx);
        evicted
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.index.remove(key)?;
        self.unlink(idx);
        Some(self.release(idx))
    }

    /// Removes the least recently used entry.
    fn pop_back(&mut self) -> Option<String> {
        let idx = self.tail?;
        let key = std::mem::take(&mut self.nodes[idx].key);
        self.index.remove(&key);
        self.unlink(idx);
        self.release(idx);
        Some(key)
    }

    fn keys_in_order(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        let mut current = self.head;
        while let Some(idx) = current {
            keys.push(self.nodes[idx].key.clone());
            current = self.nodes[idx].next;
        }
        keys
    }

    fn allocate(&mut self, key: String, value: Value) -> usize {
        let node = Node {
            key,
            value,
            prev: None,
            next: None,
        };
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = node;
            idx
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    /// Returns the slot to the free list and hands back its value.
    fn release(&mut self, idx: usize) -> Value {
        let node = &mut self.nodes[idx];
        node.key.clear();
        self.free.push(idx);
        std::mem::take(&mut node.value)
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.link_front(idx);
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = None;
        self.nodes[idx].next = self.head;
        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }
}

/// Fixed-capacity cache backend with strict recency eviction.
///
/// `put` never fails: inserting a new key into a full cache evicts the
/// least recently used entry. `get` counts as a use. `delete` of an absent
/// key reports [`StoreError::NotFound`].
///
/// Batches apply update semantics pair by pair, each under its own lock
/// acquisition, and are never rolled back: losing cached data has no
/// correctness impact.
#[derive(Debug)]
pub struct LruStore {
    inner: Mutex<RecencyList>,
    check_interval: usize,
}

impl LruStore {
    /// Creates an empty cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(RecencyList::new(capacity)),
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Sets how many batch iterations pass between cancellation checks.
    /// Zero is treated as one.
    #[must_use]
    pub fn with_check_interval(mut self, interval: usize) -> Self {
        self.check_interval = interval.max(1);
        self
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Keys from most to least recently used. Does not count as a use.
    #[must_use]
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.inner.lock().keys_in_order()
    }

    fn apply_batch<F>(&self, pairs: Vec<Pair>, mut poll: F) -> Result<Vec<Pair>>
    where
        F: FnMut() -> Result<()>,
    {
        let requested = pairs.len();
        let mut applied = Vec::with_capacity(requested);
        for (i, pair) in pairs.into_iter().enumerate() {
            if check_due(i, self.check_interval) {
                if let Err(err) = poll() {
                    warn!(
                        store = "lru",
                        requested,
                        applied = applied.len(),
                        "batch cancelled, applied pairs kept: {err}"
                    );
                    return Err(err);
                }
            }
            if self.inner.lock().update(&pair.key, pair.value.clone()) {
                applied.push(pair);
            }
        }
        debug!(store = "lru", requested, applied = applied.len(), "batch applied");
        Ok(applied)
    }
}

impl Store for LruStore {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn get(&self, key: &str) -> Result<Value> {
        self.inner
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        if let Some(evicted) = self.inner.lock().put(key, value) {
            trace!(store = "lru", key = %evicted, "evicted least recently used entry");
        }
        Ok(())
    }

    fn update(&self, key: &str, value: Value) -> Result<()> {
        if self.inner.lock().update(key, value) {
            Ok(())
        } else {
            Err(StoreError::not_found(key))
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.inner
            .lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn batch_update(&self, ctx: &BatchContext, pairs: Vec<Pair>) -> Result<Vec<Pair>> {
        ctx.check()?;
        self.apply_batch(pairs, || ctx.check())
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::error::CancelCause;

    fn cache(capacity: usize) -> LruStore {
        LruStore::new(NonZeroUsize::new(capacity).unwrap())
    }

    /// Walks the list both ways and checks it against the index.
    fn assert_consistent(list: &RecencyList) {
        let forward = list.keys_in_order();
        assert_eq!(forward.len(), list.index.len());
        assert!(forward.len() <= list.capacity);
        for key in &forward {
            let idx = list.index[key];
            assert_eq!(&list.nodes[idx].key, key);
        }

        let mut backward = Vec::new();
        let mut current = list.tail;
        while let Some(idx) = current {
            backward.push(list.nodes[idx].key.clone());
            current = list.nodes[idx].prev;
        }
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn get_put_and_evict_first_inserted() {
        let store = cache(2);
        store.put("key1", json!("value1")).unwrap();
        assert_eq!(store.get("key1").unwrap(), json!("value1"));

        store.put("key2", json!("value2")).unwrap();
        store.put("key3", json!("value3")).unwrap();

        assert!(store.get("key1").unwrap_err().is_not_found());
        assert_eq!(store.get("key2").unwrap(), json!("value2"));
        assert_eq!(store.get("key3").unwrap(), json!("value3"));
    }

    #[test]
    fn get_promotes_recency() {
        let store = cache(2);
        store.put("a", json!(1)).unwrap();
        store.put("b", json!(2)).unwrap();
        store.get("a").unwrap();
        store.put("c", json!(3)).unwrap();

        assert!(store.get("b").is_err());
        assert_eq!(store.get("a").unwrap(), json!(1));
        assert_eq!(store.get("c").unwrap(), json!(3));
    }

    #[test]
    fn put_existing_counts_as_use_and_never_evicts() {
        let store = cache(2);
        store.put("a", json!(1)).unwrap();
        store.put("b", json!(2)).unwrap();
        store.put("a", json!(10)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys_by_recency(), vec!["a", "b"]);

        store.put("c", json!(3)).unwrap();
        assert_eq!(store.keys_by_recency(), vec!["c", "a"]);
        assert_eq!(store.get("a").unwrap(), json!(10));
    }

    #[test]
    fn update_requires_existing_key_and_promotes() {
        let store = cache(3);
        store.put("a", json!(1)).unwrap();
        store.put("b", json!(2)).unwrap();

        store.update("a", json!(5)).unwrap();
        assert_eq!(store.keys_by_recency(), vec!["a", "b"]);

        assert!(store.update("zzz", json!(1)).unwrap_err().is_not_found());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_absent_is_not_found() {
        let store = cache(2);
        store.put("a", json!(1)).unwrap();
        store.delete("a").unwrap();
        assert!(store.is_empty());
        assert!(store.delete("a").unwrap_err().is_not_found());
    }

    #[test]
    fn freed_slots_are_reused() {
        let store = cache(2);
        for i in 0..50 {
            store.put(&format!("k{i}"), json!(i)).unwrap();
        }
        let inner = store.inner.lock();
        assert_eq!(inner.nodes.len(), 2);
        assert_consistent(&inner);
    }

    #[test]
    fn capacity_one_keeps_latest() {
        let store = cache(1);
        store.put("a", json!(1)).unwrap();
        store.put("b", json!(2)).unwrap();
        assert_eq!(store.keys_by_recency(), vec!["b"]);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn batch_updates_existing_and_skips_missing() {
        let store = cache(10);
        store.put("existing", json!(0)).unwrap();

        let applied = store
            .batch_update(
                &BatchContext::background(),
                vec![Pair::new("existing", "v1"), Pair::new("missing", "v2")],
            )
            .unwrap();

        assert_eq!(applied, vec![Pair::new("existing", "v1")]);
        assert_eq!(store.get("existing").unwrap(), json!("v1"));
        assert!(store.get("missing").is_err());
    }

    #[test]
    fn batch_refuses_already_cancelled_context() {
        let store = cache(4);
        store.put("a", json!(1)).unwrap();
        let ctx = BatchContext::background();
        ctx.cancel();
        assert_eq!(
            store.batch_update(&ctx, vec![Pair::new("a", 2)]),
            Err(StoreError::Cancelled(CancelCause::Cancelled))
        );
        assert_eq!(store.get("a").unwrap(), json!(1));
    }

    #[test]
    fn cancelled_batch_keeps_applied_pairs() {
        let store = cache(4);
        store.put("a", json!(1)).unwrap();
        store.put("b", json!(2)).unwrap();

        let mut polls = 0;
        let result = store.apply_batch(vec![Pair::new("a", 10), Pair::new("b", 20)], || {
            polls += 1;
            if polls == 2 {
                Err(StoreError::Cancelled(CancelCause::Cancelled))
            } else {
                Ok(())
            }
        });

        assert!(result.is_err());
        assert_eq!(store.get("a").unwrap(), json!(10));
        assert_eq!(store.get("b").unwrap(), json!(2));
    }

    #[test]
    fn check_interval_limits_polling() {
        let store = cache(2).with_check_interval(3);
        store.put("a", json!(0)).unwrap();
        let pairs: Vec<Pair> = (0..7).map(|i| Pair::new("a", i)).collect();

        let mut polls = 0;
        let applied = store
            .apply_batch(pairs, || {
                polls += 1;
                Ok(())
            })
            .unwrap();
        // Iterations 0, 3 and 6.
        assert_eq!(polls, 3);
        assert_eq!(applied.len(), 7);
        assert_eq!(store.get("a").unwrap(), json!(6));
    }

    #[test]
    fn cancellation_between_checks_is_seen_at_next_check() {
        let store = cache(4).with_check_interval(2);
        for key in ["a", "b", "c"] {
            store.put(key, json!(0)).unwrap();
        }

        let mut polls = 0;
        let result = store.apply_batch(
            vec![Pair::new("a", 1), Pair::new("b", 1), Pair::new("c", 1)],
            || {
                polls += 1;
                if polls == 2 {
                    Err(StoreError::Cancelled(CancelCause::Cancelled))
                } else {
                    Ok(())
                }
            },
        );

        assert!(result.is_err());
        // Checks run before pairs 0 and 2, so "a" and "b" landed.
        assert_eq!(store.get("a").unwrap(), json!(1));
        assert_eq!(store.get("b").unwrap(), json!(1));
        assert_eq!(store.get("c").unwrap(), json!(0));
    }

    #[test]
    fn concurrent_put_then_get() {
        let store = Arc::new(cache(1000));
        thread::scope(|s| {
            for i in 0..200 {
                let store = &store;
                s.spawn(move || {
                    let key = format!("key-{i}");
                    store.put(&key, json!(i)).unwrap();
                    assert_eq!(store.get(&key).unwrap(), json!(i));
                });
            }
        });
        assert_eq!(store.len(), 200);
        assert_consistent(&store.inner.lock());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Get(u8),
        Put(u8, i64),
        Update(u8, i64),
        Delete(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..12).prop_map(Op::Get),
            (0u8..12, any::<i64>()).prop_map(|(k, v)| Op::Put(k, v)),
            (0u8..12, any::<i64>()).prop_map(|(k, v)| Op::Update(k, v)),
            (0u8..12).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn prop_index_and_list_stay_consistent(
            capacity in 1usize..6,
            ops in prop::collection::vec(op_strategy(), 0..80),
        ) {
            let store = cache(capacity);
            // Reference model: most recently used at the front.
            let mut model: Vec<(String, i64)> = Vec::new();

            for op in ops {
                match op {
                    Op::Get(k) => {
                        let key = format!("k{k}");
                        let got = store.get(&key).ok();
                        let pos = model.iter().position(|(mk, _)| *mk == key);
                        prop_assert_eq!(got.is_some(), pos.is_some());
                        if let Some(pos) = pos {
                            let entry = model.remove(pos);
                            prop_assert_eq!(got.unwrap(), json!(entry.1));
                            model.insert(0, entry);
                        }
                    }
                    Op::Put(k, v) => {
                        let key = format!("k{k}");
                        store.put(&key, json!(v)).unwrap();
                        if let Some(pos) = model.iter().position(|(mk, _)| *mk == key) {
                            model.remove(pos);
                        } else if model.len() >= capacity {
                            model.pop();
                        }
                        model.insert(0, (key, v));
                    }
                    Op::Update(k, v) => {
                        let key = format!("k{k}");
                        let result = store.update(&key, json!(v));
                        if let Some(pos) = model.iter().position(|(mk, _)| *mk == key) {
                            prop_assert!(result.is_ok());
                            model.remove(pos);
                            model.insert(0, (key, v));
                        } else {
                            prop_assert!(result.is_err());
                        }
                    }
                    Op::Delete(k) => {
                        let key = format!("k{k}");
                        let result = store.delete(&key);
                        if let Some(pos) = model.iter().position(|(mk, _)| *mk == key) {
                            prop_assert!(result.is_ok());
                            model.remove(pos);
                        } else {
                            prop_assert!(result.is_err());
                        }
                    }
                }

                assert_consistent(&store.inner.lock());
                let expected: Vec<String> = model.iter().map(|(k, _)| k.clone()).collect();
                prop_assert_eq!(store.keys_by_recency(), expected);
            }
        }
    }
}
