//! Entity-store seam (half of component C3, spec §4.3).
//!
//! The entity store is explicitly out of scope as an implementation (spec
//! §1): this module only defines the seam the coherence protocol calls
//! through, plus an in-process stub used by tests. A production build
//! wires [`EntityStore`] to a real store client (e.g. a generated gRPC
//! client); this crate ships none.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::entity::{EntityKey, KeyId, PropertyList};
use crate::error::StoreError;
use crate::txn::{TxnCallback, TxnClient};

/// Options accepted by [`EntityStore::run_in_transaction`]. Empty for now;
/// a real store binding would add cross-group/isolation-level knobs here.
#[derive(Debug, Clone, Default)]
pub struct TxnOptions {
    pub max_attempts: u32,
}

/// The durable backend: owns truth, provides batch primary-key
/// get/put/delete and transactions (spec §1, GLOSSARY "Entity store").
///
/// `get_multi` writes into `dst` in place (mirroring the original
/// `datastore.GetMulti(c, keys, dst)` shape) rather than returning owned
/// values, so a caller-provided destination buffer is reused across
/// windows by the batch splitter.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_multi(
        &self,
        keys: &[EntityKey],
        dst: &mut [PropertyList],
    ) -> Vec<Result<(), StoreError>>;

    /// Returns the (possibly server-allocated) keys alongside per-index
    /// outcomes; an incomplete key in `keys` is assigned a stable id on
    /// success (spec §3 "Entity key").
    async fn put_multi(
        &self,
        keys: &[EntityKey],
        src: &[PropertyList],
    ) -> (Vec<EntityKey>, Vec<Result<(), StoreError>>);

    async fn delete_multi(&self, keys: &[EntityKey]) -> Vec<Result<(), StoreError>>;

    async fn run_in_transaction(
        &self,
        client: TxnClient,
        f: TxnCallback,
        opts: TxnOptions,
    ) -> Result<(), StoreError>;
}

/// In-process fake store used by tests and examples. Not exported as the
/// production default — [`crate::client::ClientBuilder`] requires an
/// explicit `EntityStore` implementation.
#[derive(Default)]
pub struct StubEntityStore {
    entities: Mutex<HashMap<EntityKey, PropertyList>>,
    next_id: AtomicI64,
    /// When set, every `get_multi` index fails with this error instead of
    /// reading `entities` — simulates a per-index store multi-error (spec
    /// §8 scenario S7).
    fail_get: Mutex<Option<StoreError>>,
    fail_put: Mutex<Option<StoreError>>,
    fail_delete: Mutex<Option<StoreError>>,
}

impl StubEntityStore {
    pub fn new() -> Self {
        Self {
            entities: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1000),
            fail_get: Mutex::new(None),
            fail_put: Mutex::new(None),
            fail_delete: Mutex::new(None),
        }
    }

    pub fn fail_get_with(&self, err: StoreError) {
        *self.fail_get.lock().unwrap() = Some(err);
    }

    pub fn fail_put_with(&self, err: StoreError) {
        *self.fail_put.lock().unwrap() = Some(err);
    }

    pub fn fail_delete_with(&self, err: StoreError) {
        *self.fail_delete.lock().unwrap() = Some(err);
    }

    pub fn clear_failures(&self) {
        *self.fail_get.lock().unwrap() = None;
        *self.fail_put.lock().unwrap() = None;
        *self.fail_delete.lock().unwrap() = None;
    }

    /// Directly seeds an entity, bypassing `put_multi`, for test setup.
    pub fn seed(&self, key: EntityKey, props: PropertyList) {
        self.entities.lock().unwrap().insert(key, props);
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl EntityStore for StubEntityStore {
    async fn get_multi(
        &self,
        keys: &[EntityKey],
        dst: &mut [PropertyList],
    ) -> Vec<Result<(), StoreError>> {
        if let Some(err) = self.fail_get.lock().unwrap().clone() {
            return vec![Err(err); keys.len()];
        }

        let entities = self.entities.lock().unwrap();
        keys.iter()
            .zip(dst.iter_mut())
            .map(|(key, slot)| match entities.get(key) {
                Some(props) => {
                    *slot = props.clone();
                    Ok(())
                }
                None => Err(StoreError::NotFound),
            })
            .collect()
    }

    async fn put_multi(
        &self,
        keys: &[EntityKey],
        src: &[PropertyList],
    ) -> (Vec<EntityKey>, Vec<Result<(), StoreError>>) {
        if let Some(err) = self.fail_put.lock().unwrap().clone() {
            return (keys.to_vec(), vec![Err(err); keys.len()]);
        }

        let mut entities = self.entities.lock().unwrap();
        let mut returned_keys = Vec::with_capacity(keys.len());
        let mut results = Vec::with_capacity(keys.len());
        for (key, props) in keys.iter().zip(src.iter()) {
            let resolved = if key.is_complete() {
                key.clone()
            } else {
                EntityKey::new(String::new(), key.kind(), KeyId::Int(self.allocate_id()))
            };
            entities.insert(resolved.clone(), props.clone());
            returned_keys.push(resolved);
            results.push(Ok(()));
        }
        (returned_keys, results)
    }

    async fn delete_multi(&self, keys: &[EntityKey]) -> Vec<Result<(), StoreError>> {
        if let Some(err) = self.fail_delete.lock().unwrap().clone() {
            return vec![Err(err); keys.len()];
        }

        let mut entities = self.entities.lock().unwrap();
        keys.iter()
            .map(|key| {
                entities.remove(key);
                Ok(())
            })
            .collect()
    }

    async fn run_in_transaction(
        &self,
        client: TxnClient,
        f: TxnCallback,
        _opts: TxnOptions,
    ) -> Result<(), StoreError> {
        f(client).await
    }
}
