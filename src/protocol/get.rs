//! GET (read-through), spec §4.5 phases R1-R4.

use std::sync::Arc;

use crate::backend::memcache::SharedCache;
use crate::backend::store::EntityStore;
use crate::codec::Codec;
use crate::config::Config;
use crate::entity::{EntityKey, PropertyList};
use crate::error::StoreError;
use crate::item::{CacheItem, CasToken};
use crate::key::derive_cache_key;
use crate::metrics::Metrics;

use super::lock_nonce;

/// R1's classification of a key before any store traffic.
enum Probe {
    /// Resolved entirely from the cache; nothing else to do for this index.
    Served(Result<PropertyList, StoreError>),
    /// Seen under `LOCK_ITEM`, or the whole cache call errored: must read
    /// through, must never repopulate (spec §3 point 4).
    Contended,
    /// Miss, unknown flag, decode failure, or per-item cache error: read
    /// through and may repopulate if the R2 lock-ADD succeeds.
    Uncached,
}

/// Executes GET for one batch window. `dst[i]` receives the decoded value
/// for `keys[i]` on success; the returned vector mirrors
/// [`EntityStore::get_multi`]'s per-index `Result<(), StoreError>` shape.
pub async fn get_multi(
    cache: &Arc<dyn SharedCache>,
    store: &Arc<dyn EntityStore>,
    codec: &Arc<dyn Codec>,
    config: &Config,
    metrics: &Metrics,
    keys: &[EntityKey],
    dst: &mut [PropertyList],
) -> Vec<Result<(), StoreError>> {
    let n = keys.len();
    if n == 0 {
        return Vec::new();
    }

    let cache_keys: Vec<_> = keys
        .iter()
        .map(|k| derive_cache_key(k, crate::key::KEY_VERSION, config.max_cache_key_len))
        .collect();

    // Phase R1 — probe cache.
    let mut probes: Vec<Probe> = Vec::with_capacity(n);
    match cache.get_multi(&cache_keys).await {
        Ok(hits) => {
            for cache_key in &cache_keys {
                probes.push(match hits.get(cache_key) {
                    Some(item) => classify_hit(item, codec),
                    None => Probe::Uncached,
                });
            }
        }
        Err(_) => {
            // Whole-call cache error degrades every key to uncached
            // (spec §4.5 R1, "If cache.GetMulti itself errors").
            metrics.record_cache_miss_all(n);
            probes.extend((0..n).map(|_| Probe::Uncached));
        }
    }

    // Apply R1-resolved decodes into dst/results, and collect which indices
    // still need store traffic.
    let mut results: Vec<Option<Result<(), StoreError>>> = vec![None; n];
    let mut need_store: Vec<usize> = Vec::new();
    let mut uncached: Vec<usize> = Vec::new();

    for (i, probe) in probes.into_iter().enumerate() {
        match probe {
            Probe::Served(Ok(props)) => {
                metrics.record_cache_hit();
                dst[i] = props;
                results[i] = Some(Ok(()));
            }
            Probe::Served(Err(e)) => {
                metrics.record_cache_hit();
                results[i] = Some(Err(e));
            }
            Probe::Contended => {
                metrics.record_lock_contention();
                need_store.push(i);
            }
            Probe::Uncached => {
                metrics.record_cache_miss();
                uncached.push(i);
                need_store.push(i);
            }
        }
    }

    // Phase R2 — attempt lock-ADD for uncached (non-contended) keys.
    let mut tokens: std::collections::HashMap<usize, CasToken> = std::collections::HashMap::new();
    if !uncached.is_empty() {
        let items: Vec<_> = uncached
            .iter()
            .map(|&i| {
                let nonce = lock_nonce();
                (cache_keys[i].clone(), CacheItem::lock(&nonce, config.lock_ttl_read))
            })
            .collect();
        let add_results = cache.add_multi(items).await;
        for (&i, add_result) in uncached.iter().zip(add_results.into_iter()) {
            match add_result {
                Ok(token) => {
                    tokens.insert(i, token);
                }
                Err(_) => {
                    // ADD failure (including "already present") demotes to
                    // contended (spec §4.5 R2); still needs the store read
                    // already queued in `need_store`, just never a writeback.
                    metrics.record_lock_contention();
                }
            }
        }
    }

    // Phase R3 — store read for every uncached + contended key.
    if !need_store.is_empty() {
        let store_keys: Vec<_> = need_store.iter().map(|&i| keys[i].clone()).collect();
        let mut store_dst = vec![PropertyList::new(); need_store.len()];
        let store_results = store.get_multi(&store_keys, &mut store_dst).await;

        for ((&i, result), value) in need_store.iter().zip(store_results.into_iter()).zip(store_dst.into_iter()) {
            match &result {
                Ok(()) => dst[i] = value,
                Err(_) => {}
            }
            results[i] = Some(result);
        }
    }

    // Phase R4 — CAS writeback for keys that owned a lock from R2 and
    // whose store read resolved (success or NotFound). Contended keys
    // never reach here (spec §4.5, "the invariant that preserves
    // consistency").
    let mut writeback_items = Vec::new();
    for &i in &uncached {
        let Some(token) = tokens.get(&i) else { continue };
        match &results[i] {
            Some(Ok(())) => {
                if let Ok(bytes) = codec.encode(&dst[i]) {
                    writeback_items.push((cache_keys[i].clone(), {
                        let mut item = CacheItem::entity(bytes, config.lock_ttl_read);
                        item.cas_token = Some(token.clone());
                        item
                    }));
                }
                // Encode failure: writeback silently skipped (spec §4.2).
            }
            Some(Err(StoreError::NotFound)) => {
                writeback_items.push((cache_keys[i].clone(), {
                    let mut item = CacheItem::none(config.lock_ttl_read);
                    item.cas_token = Some(token.clone());
                    item
                }));
            }
            _ => {
                // Other store errors: no cache write for that key (spec §4.5 R3).
            }
        }
    }

    if !writeback_items.is_empty() {
        let cas_results = cache.compare_and_swap_multi(writeback_items).await;
        for result in cas_results {
            match result {
                Ok(()) => metrics.record_cas_success(),
                Err(_) => metrics.record_cas_failure(),
            }
        }
    }

    results
        .into_iter()
        .map(|r| r.expect("every index is resolved by either R1 or R3"))
        .collect()
}

fn classify_hit(item: &CacheItem, codec: &Arc<dyn Codec>) -> Probe {
    use crate::flags::Flags;
    match item.flags {
        Flags::EntityItem => match codec.decode(&item.value) {
            Ok(props) => Probe::Served(Ok(props)),
            Err(_) => Probe::Uncached,
        },
        Flags::NoneItem => Probe::Served(Err(StoreError::NotFound)),
        Flags::LockItem => Probe::Contended,
        Flags::Unknown(_) => Probe::Uncached,
    }
}
