//! Transaction-scoped invalidation (spec §4.5 "PUT" phase W3, §9).
//!
//! The callback runs against a [`TxnClient`] shim that records touched
//! keys; on commit, [`run_in_transaction`] issues `cache.DeleteMulti` for
//! those keys. Failure to invalidate is non-fatal — the lock TTL bounds
//! staleness anyway.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::backend::memcache::SharedCache;
use crate::backend::store::{EntityStore, TxnOptions};
use crate::config::Config;
use crate::entity::{EntityKey, PropertyList};
use crate::error::StoreError;
use crate::key::{derive_cache_key, KEY_VERSION};

/// The callback passed to [`crate::client::Client::run_in_transaction`].
pub type TxnCallback =
    Box<dyn FnOnce(TxnClient) -> BoxFuture<'static, Result<(), StoreError>> + Send>;

/// A handle used inside a transaction callback. Mutating operations route
/// through the real store; every touched key is recorded so the
/// post-commit invalidation step knows what to delete.
#[derive(Clone)]
pub struct TxnClient {
    store: Arc<dyn EntityStore>,
    touched: Arc<Mutex<Vec<EntityKey>>>,
}

impl TxnClient {
    pub(crate) fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            touched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn get_multi(&self, keys: &[EntityKey], dst: &mut [PropertyList]) -> Vec<Result<(), StoreError>> {
        self.store.get_multi(keys, dst).await
    }

    pub async fn put_multi(
        &self,
        keys: &[EntityKey],
        src: &[PropertyList],
    ) -> (Vec<EntityKey>, Vec<Result<(), StoreError>>) {
        self.touched.lock().await.extend_from_slice(keys);
        self.store.put_multi(keys, src).await
    }

    pub async fn delete_multi(&self, keys: &[EntityKey]) -> Vec<Result<(), StoreError>> {
        self.touched.lock().await.extend_from_slice(keys);
        self.store.delete_multi(keys).await
    }

    async fn touched_keys(&self) -> Vec<EntityKey> {
        self.touched.lock().await.clone()
    }
}

/// Runs `f` inside the store's transaction primitive, then invalidates
/// every cache entry the callback touched.
pub(crate) async fn run_in_transaction(
    store: &Arc<dyn EntityStore>,
    cache: &Arc<dyn SharedCache>,
    config: &Config,
    f: TxnCallback,
    opts: TxnOptions,
) -> Result<(), StoreError> {
    let txn_client = TxnClient::new(store.clone());
    let result = store.run_in_transaction(txn_client.clone(), f, opts).await;

    if result.is_ok() {
        let touched = txn_client.touched_keys().await;
        if !touched.is_empty() {
            let cache_keys: Vec<_> = touched
                .iter()
                .map(|k| derive_cache_key(k, KEY_VERSION, config.max_cache_key_len))
                .collect();
            // Best-effort: delete failures are swallowed, per spec §4.5 W3.
            let _ = cache.delete_multi(&cache_keys).await;
        }
    }

    result
}
