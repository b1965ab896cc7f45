//! FNV-1a hash utilities for shard routing.
//!
//! Routing must be stable for the lifetime of a store, so it uses a fixed,
//! unseeded hash rather than `std`'s randomized `DefaultHasher`.

/// FNV-1a offset basis (32-bit).
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

/// FNV-1a prime (32-bit).
const FNV_PRIME: u32 = 0x0100_0193;

/// Computes a 32-bit FNV-1a hash over the UTF-8 bytes of a string.
///
/// # Examples
///
/// ```
/// use memkv_core::hash::fnv1a_hash;
///
/// assert_eq!(fnv1a_hash("hello"), 1_335_831_723);
/// assert_eq!(fnv1a_hash(""), 2_166_136_261); // FNV offset basis
/// ```
#[must_use]
pub fn fnv1a_hash(s: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Maps a key to a shard index in `[0, shard_count)`.
///
/// A `shard_count` of zero is treated as one.
///
/// # Examples
///
/// ```
/// use memkv_core::hash::shard_for_key;
///
/// assert_eq!(shard_for_key("hello", 32), 11);
/// assert_eq!(shard_for_key("key1", 32), 7);
/// ```
#[must_use]
pub fn shard_for_key(key: &str, shard_count: usize) -> usize {
    let count = shard_count.max(1);
    // u32 -> usize is lossless on every supported target.
    fnv1a_hash(key) as usize % count
}
