//! Store contract and its in-memory backends.
//!
//! - [`Store`]: the capability set every backend implements identically in
//!   meaning (get, put, update, delete, batch update)
//! - [`engines`]: the three concrete backends
//! - [`StoreConfig`]: builds a backend chosen at startup as `Arc<dyn Store>`

pub mod engine;
pub mod engines;
pub mod factory;

pub use engine::*;
pub use engines::{LruStore, ShardedStore, WriteOptimizedStore};
pub use factory::*;
