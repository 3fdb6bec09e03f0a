//! Cache-key deriver (component C1, spec §4.1).
//!
//! Deterministic, collision-resistant across the space of distinct entity
//! keys, length-bounded. A version prefix is carried so future encoding
//! changes cannot collide with old entries.

use crate::entity::EntityKey;

/// The cache's per-key length ceiling absent an explicit [`crate::config::Config`]
/// override. 250 bytes matches memcached's historical key-length limit.
pub const MAX_CACHE_KEY_LEN: usize = 250;

/// Version byte prefixed to every derived key.
pub const KEY_VERSION: u8 = 1;

/// A derived shared-cache key: opaque bytes, never constructed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(pub Vec<u8>);

/// Derives a shared-cache key for `key`.
///
/// If the canonical form plus version prefix would exceed `max_len`, the
/// deriver falls back to a fixed-length digest of the canonical string
/// (spec §4.1) so arbitrarily long entity keys never violate the cache's
/// own key-length ceiling.
pub fn derive_cache_key(key: &EntityKey, version: u8, max_len: usize) -> CacheKey {
    let canonical = key.canonical();

    let mut buf = Vec::with_capacity(canonical.len() + 1);
    buf.push(version);
    buf.extend_from_slice(canonical.as_bytes());

    if buf.len() <= max_len {
        return CacheKey(buf);
    }

    let digest = blake3::hash(canonical.as_bytes());
    let mut buf = Vec::with_capacity(1 + blake3::OUT_LEN);
    buf.push(version);
    buf.extend_from_slice(digest.as_bytes());
    buf.truncate(max_len.max(1));
    CacheKey(buf)
}
