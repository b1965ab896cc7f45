//! Concrete [`Store`](super::Store) backends.

pub mod lru;
pub mod sharded;
pub mod write_optimized;

pub use lru::LruStore;
pub use sharded::ShardedStore;
pub use write_optimized::WriteOptimizedStore;

/// Default number of batch iterations between cancellation checks.
pub const DEFAULT_CHECK_INTERVAL: usize = 1;

/// Whether iteration `index` of a batch loop should re-test cancellation.
///
/// Iteration 0 is always checked, then every `interval`-th one.
#[inline]
pub(crate) fn check_due(index: usize, interval: usize) -> bool {
    index % interval.max(1) == 0
}

#[cfg(test)]
mod tests {
    use super::check_due;

    #[test]
    fn check_due_every_iteration() {
        assert!((0..10).all(|i| check_due(i, 1)));
    }

    #[test]
    fn check_due_every_third() {
        let due: Vec<usize> = (0..10).filter(|i| check_due(*i, 3)).collect();
        assert_eq!(due, vec![0, 3, 6, 9]);
    }

    #[test]
    fn check_due_zero_interval_is_one() {
        assert!((0..5).all(|i| check_due(i, 0)));
    }
}
