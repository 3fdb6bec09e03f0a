//! DELETE (write-through invalidate), spec §4.5 — structurally identical
//! to PUT: lock cache with `LOCK_ITEM`, then `store.DeleteMulti`, no
//! writeback.

use std::sync::Arc;

use crate::backend::memcache::SharedCache;
use crate::backend::store::EntityStore;
use crate::config::Config;
use crate::entity::EntityKey;
use crate::error::{Error, MultiError};
use crate::item::CacheItem;
use crate::key::derive_cache_key;
use crate::metrics::Metrics;

use super::lock_nonce;

pub async fn delete_multi(
    cache: &Arc<dyn SharedCache>,
    store: &Arc<dyn EntityStore>,
    config: &Config,
    metrics: &Metrics,
    keys: &[EntityKey],
) -> Result<(), Error> {
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
        for result in cache.set_multi(items).await {
            if result.is_ok() {
                metrics.record_write_lock();
            }
        }
    }

    let results = store.delete_multi(keys).await;
    let multi = MultiError(results.into_iter().map(|r| r.err()).collect());
    if multi.is_nil() {
        Ok(())
    } else {
        Err(Error::Multi(multi))
    }
}
