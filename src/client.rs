//! The public `Client` (spec §6 "External interfaces").
//!
//! Bundles the two backend seams (C3), the codec (C2), tunables, and
//! metrics into one value-typed handle. This replaces the original
//! source's package-level mutable function-pointer seams with fields on
//! a constructed object (spec §9, DESIGN NOTES): `Client::builder()`
//! wires real backends by default, `ClientBuilder::shared_cache` /
//! `.entity_store` / `.codec` let tests substitute stubs for either tier
//! independently.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::backend::memcache::SharedCache;
use crate::backend::store::{EntityStore, TxnOptions};
use crate::batch::{validate_lengths, window_bounds};
use crate::codec::{BincodeCodec, Codec};
use crate::config::Config;
use crate::entity::{Entity, EntityKey, PropertyList};
use crate::error::{Error, MultiError, Result, StoreError};
use crate::metrics::{Metrics, Stats};
use crate::protocol::{delete, get, put};
use crate::txn::{TxnCallback, TxnClient};

/// The coherence-protocol client. Cheap to clone (all fields are `Arc`-ish
/// or `Copy`-light); typically constructed once per process.
pub struct Client {
    cache: Arc<dyn SharedCache>,
    store: Arc<dyn EntityStore>,
    codec: Arc<dyn Codec>,
    config: Config,
    metrics: Metrics,
}

/// Builds a [`Client`]. Both backend seams must be supplied explicitly —
/// there is no implicit production default, since this crate does not
/// ship a concrete entity-store or shared-cache implementation (spec §1,
/// "explicitly out of scope").
#[derive(Default)]
pub struct ClientBuilder {
    cache: Option<Arc<dyn SharedCache>>,
    store: Option<Arc<dyn EntityStore>>,
    codec: Option<Arc<dyn Codec>>,
    config: Option<Config>,
}

impl ClientBuilder {
    pub fn shared_cache(mut self, cache: Arc<dyn SharedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn entity_store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Client> {
        let store = self
            .store
            .ok_or_else(|| Error::Argument("ClientBuilder requires an entity store".into()))?;
        let cache = self
            .cache
            .ok_or_else(|| Error::Argument("ClientBuilder requires a shared cache".into()))?;
        Ok(Client {
            cache,
            store,
            codec: self.codec.unwrap_or_else(|| Arc::new(BincodeCodec)),
            config: self.config.unwrap_or_default(),
            metrics: Metrics::default(),
        })
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// A point-in-time snapshot of cache hit/miss and CAS counters (spec
    /// §9 DESIGN NOTES Open Question, "An implementer may choose to emit a
    /// diagnostic counter").
    pub fn stats(&self) -> Stats {
        self.metrics.snapshot()
    }

    #[tracing::instrument(skip(self, dst))]
    pub async fn get<T: Entity>(&self, key: &EntityKey, dst: &mut T) -> Result<()> {
        let mut dsts = [dst.clone()];
        self.get_multi(std::slice::from_ref(key), &mut dsts).await?;
        *dst = dsts[0].clone();
        Ok(())
    }

    #[tracing::instrument(skip(self, keys, dst), fields(n = keys.len()))]
    pub async fn get_multi<T: Entity>(&self, keys: &[EntityKey], dst: &mut [T]) -> Result<()> {
        validate_lengths(keys.len(), dst.len())?;
        if keys.is_empty() {
            return Ok(());
        }
        if let Some(key) = keys.iter().find(|k| !k.is_complete()) {
            return Err(Error::Argument(format!("incomplete key cannot be read: {key}")));
        }

        let mut chunks = Vec::new();
        for (start, end) in window_bounds(keys.len(), self.config.batch_window) {
            let mut props: Vec<PropertyList> = vec![PropertyList::new(); end - start];
            let results = get::get_multi(
                &self.cache,
                &self.store,
                &self.codec,
                &self.config,
                &self.metrics,
                &keys[start..end],
                &mut props,
            )
            .await;

            let mut window_errs = Vec::with_capacity(end - start);
            for (i, result) in results.into_iter().enumerate() {
                match result {
                    Ok(()) => match T::from_properties(props[i].clone()) {
                        Ok(value) => {
                            dst[start + i] = value;
                            window_errs.push(None);
                        }
                        Err(e) => window_errs.push(Some(StoreError::Rpc(format!(
                            "entity conversion failed: {e}"
                        )))),
                    },
                    Err(e) => window_errs.push(Some(e)),
                }
            }
            chunks.push(MultiError(window_errs));
        }

        let merged = MultiError::merge(chunks);
        if merged.is_nil() {
            Ok(())
        } else if keys.len() == 1 {
            Err(Error::Store(merged.0.into_iter().next().flatten().unwrap()))
        } else {
            Err(Error::Multi(merged))
        }
    }

    #[tracing::instrument(skip(self, src))]
    pub async fn put<T: Entity>(&self, key: &EntityKey, src: &T) -> Result<EntityKey> {
        let keys = self.put_multi(std::slice::from_ref(key), std::slice::from_ref(src)).await?;
        Ok(keys.into_iter().next().unwrap())
    }

    #[tracing::instrument(skip(self, keys, src), fields(n = keys.len()))]
    pub async fn put_multi<T: Entity>(&self, keys: &[EntityKey], src: &[T]) -> Result<Vec<EntityKey>> {
        validate_lengths(keys.len(), src.len())?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut returned = Vec::with_capacity(keys.len());
        for (start, end) in window_bounds(keys.len(), self.config.batch_window) {
            let props: Vec<PropertyList> = src[start..end].iter().map(Entity::to_properties).collect();
            let window_keys =
                put::put_multi(&self.cache, &self.store, &self.config, &self.metrics, &keys[start..end], &props)
                    .await?;
            returned.extend(window_keys);
        }
        Ok(returned)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &EntityKey) -> Result<()> {
        self.delete_multi(std::slice::from_ref(key)).await
    }

    #[tracing::instrument(skip(self, keys), fields(n = keys.len()))]
    pub async fn delete_multi(&self, keys: &[EntityKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        for (start, end) in window_bounds(keys.len(), self.config.batch_window) {
            delete::delete_multi(&self.cache, &self.store, &self.config, &self.metrics, &keys[start..end]).await?;
        }
        Ok(())
    }

    /// Runs `f` inside the store's transaction primitive; on commit,
    /// every key the callback touched is invalidated in the cache (spec
    /// §4.5 W3 "post-commit invalidation").
    pub async fn run_in_transaction<F>(&self, f: F, opts: TxnOptions) -> Result<()>
    where
        F: FnOnce(TxnClient) -> BoxFuture<'static, std::result::Result<(), StoreError>> + Send + 'static,
    {
        let callback: TxnCallback = Box::new(f);
        crate::txn::run_in_transaction(&self.store, &self.cache, &self.config, callback, opts)
            .await
            .map_err(Error::Store)
    }
}
