//! PUT (write-through invalidate), spec §4.5 phases W1-W3.

use std::sync::Arc;

use crate::backend::memcache::SharedCache;
use crate::backend::store::EntityStore;
use crate::config::Config;
use crate::entity::{EntityKey, PropertyList};
use crate::error::Error;
use crate::item::CacheItem;
use crate::key::derive_cache_key;
use crate::metrics::Metrics;

use super::lock_nonce;

/// Executes PUT for one batch window: lock every cache entry, then write
/// the store. Never writes `ENTITY_ITEM` back — the lock alone invalidates
/// (spec §4.5 W3).
pub async fn put_multi(
    cache: &Arc<dyn SharedCache>,
    store: &Arc<dyn EntityStore>,
    config: &Config,
    metrics: &Metrics,
    keys: &[EntityKey],
    src: &[PropertyList],
) -> Result<Vec<EntityKey>, Error> {
    // Phase W1 — unconditionally overwrite the cache with a lock, long TTL
    // (spec §4.5 W1: "must succeed even if a prior lock or entity is
    // present"). Cache errors are swallowed; the store write must proceed
    // regardless (spec §4.5 W1, "Cache errors here are swallowed").
    let lockable: Vec<_> = keys.iter().filter(|k| k.is_complete()).collect();
    if !lockable.is_empty() {
        let items: Vec<_> = lockable
            .iter()
            .map(|k| {
                let nonce = lock_nonce();
                (
                    derive_cache_key(k, crate::key::KEY_VERSION, config.max_cache_key_len),
                    CacheItem::lock(&nonce, config.lock_ttl_write),
                )
            })
            .collect();
        let set_results = cache.set_multi(items).await;
        for result in set_results {
            if result.is_ok() {
                metrics.record_write_lock();
            }
            // Per-item cache errors never surface (spec §7 "Cache-tier ...
            // always swallowed").
        }
    }

    // Phase W2 — store write. Phase W3 (no writeback) is simply the
    // absence of any cache write after this point; the next reader
    // repopulates via R1-R4.
    let (returned_keys, results) = store.put_multi(keys, src).await;
    let multi = crate::error::MultiError(results.into_iter().map(|r| r.err()).collect());
    if multi.is_nil() {
        Ok(returned_keys)
    } else {
        Err(Error::Multi(multi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memcache::StubSharedCache;
    use crate::backend::store::StubEntityStore;
    use crate::entity::PropertyValue;
    use crate::error::StoreError;
    use crate::flags::Flags;

    #[tokio::test]
    async fn test_put_locks_cache_before_store_write() {
        let stub_cache = Arc::new(StubSharedCache::new());
        let cache: Arc<dyn SharedCache> = stub_cache.clone();
        let store: Arc<dyn EntityStore> = Arc::new(StubEntityStore::new());
        let config = Config::default();
        let metrics = Metrics::default();

        let key = EntityKey::numbered("Entity", 1);
        let props = PropertyList::new().set("IntVal", PropertyValue::Int(5));
        let returned = put_multi(&cache, &store, &config, &metrics, &[key.clone()], &[props]).await.unwrap();
        assert_eq!(returned[0], key);

        let cache_key = derive_cache_key(&key, crate::key::KEY_VERSION, config.max_cache_key_len);
        let fetched = cache.get_multi(&[cache_key]).await.unwrap();
        assert_eq!(fetched.values().next().unwrap().flags, Flags::LockItem);
        assert_eq!(metrics.snapshot().write_locks, 1);
    }

    #[tokio::test]
    async fn test_cache_outage_does_not_block_store_write() {
        let stub_cache = StubSharedCache::new();
        stub_cache.fail_set(true);
        let cache: Arc<dyn SharedCache> = Arc::new(stub_cache);
        let store: Arc<dyn EntityStore> = Arc::new(StubEntityStore::new());
        let config = Config::default();
        let metrics = Metrics::default();

        let key = EntityKey::numbered("Entity", 1);
        let props = PropertyList::new().set("IntVal", PropertyValue::Int(5));
        let result = put_multi(&cache, &store, &config, &metrics, &[key], &[props]).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_multi_error() {
        let cache: Arc<dyn SharedCache> = Arc::new(StubSharedCache::new());
        let stub_store = StubEntityStore::new();
        stub_store.fail_put_with(StoreError::Rpc("disk full".into()));
        let store: Arc<dyn EntityStore> = Arc::new(stub_store);
        let config = Config::default();
        let metrics = Metrics::default();

        let key = EntityKey::numbered("Entity", 1);
        let props = PropertyList::new().set("IntVal", PropertyValue::Int(5));
        let result = put_multi(&cache, &store, &config, &metrics, &[key], &[props]).await;
        assert!(matches!(result, Err(Error::Multi(_))));
    }

    #[tokio::test]
    async fn test_incomplete_key_is_not_locked_but_still_stored() {
        let stub_cache = Arc::new(StubSharedCache::new());
        let cache: Arc<dyn SharedCache> = stub_cache.clone();
        let store: Arc<dyn EntityStore> = Arc::new(StubEntityStore::new());
        let config = Config::default();
        let metrics = Metrics::default();

        let key = EntityKey::incomplete("Entity");
        let props = PropertyList::new().set("IntVal", PropertyValue::Int(5));
        let returned = put_multi(&cache, &store, &config, &metrics, &[key], &[props]).await.unwrap();
        assert!(returned[0].is_complete());
        assert_eq!(metrics.snapshot().write_locks, 0);
    }
}
