//! Shared-cache seam (half of component C3, spec §4.3).
//!
//! The shared cache is explicitly out of scope as an implementation (spec
//! §1): this module defines the seam the coherence protocol calls through,
//! plus an in-process stub with the same ADD/SET/CAS semantics a real
//! memcache-style client provides. A production build wires
//! [`SharedCache`] to a real client; this crate ships none.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::CacheRpcError;
use crate::item::{CacheItem, CasToken};
use crate::key::CacheKey;

/// Network-attached memcache-style cache with per-item byte values,
/// integer flags, expirations, atomic ADD, and CAS (spec §1, GLOSSARY
/// "Shared cache").
#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get_multi(
        &self,
        keys: &[CacheKey],
    ) -> Result<HashMap<CacheKey, CacheItem>, CacheRpcError>;

    /// ADD succeeds only if the key is absent (or its prior entry expired).
    async fn add_multi(
        &self,
        items: Vec<(CacheKey, CacheItem)>,
    ) -> Vec<Result<CasToken, CacheRpcError>>;

    /// SET is unconditional; used for the writer's lock overwrite (spec
    /// §4.5 W1), which must succeed even over a live lock or entity.
    async fn set_multi(&self, items: Vec<(CacheKey, CacheItem)>) -> Vec<Result<(), CacheRpcError>>;

    /// Succeeds only if `cas_token` on each item still matches the live
    /// entry's token (spec §4.5 R4, "CAS writeback").
    async fn compare_and_swap_multi(
        &self,
        items: Vec<(CacheKey, CacheItem)>,
    ) -> Vec<Result<(), CacheRpcError>>;

    async fn delete_multi(&self, keys: &[CacheKey]) -> Vec<Result<(), CacheRpcError>>;
}

struct Entry {
    item: CacheItem,
    generation: u64,
    installed_at: Instant,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.installed_at.elapsed() < self.item.expiry
    }
}

/// In-process fake shared cache. Supports forcing any of the four seams
/// to fail independently (spec §11 "Forced-fail injection on each of the
/// four memcache seams independently"), rather than one monolithic
/// "cache is down" switch.
#[derive(Default)]
pub struct StubSharedCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    next_generation: AtomicU64,
    fail_get: Mutex<bool>,
    fail_add: Mutex<bool>,
    fail_set: Mutex<bool>,
    fail_cas: Mutex<bool>,
    fail_delete: Mutex<bool>,
}

impl StubSharedCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
            fail_get: Mutex::new(false),
            fail_add: Mutex::new(false),
            fail_set: Mutex::new(false),
            fail_cas: Mutex::new(false),
            fail_delete: Mutex::new(false),
        }
    }

    pub fn fail_get(&self, fail: bool) {
        *self.fail_get.lock().unwrap() = fail;
    }

    pub fn fail_add(&self, fail: bool) {
        *self.fail_add.lock().unwrap() = fail;
    }

    pub fn fail_set(&self, fail: bool) {
        *self.fail_set.lock().unwrap() = fail;
    }

    pub fn fail_cas(&self, fail: bool) {
        *self.fail_cas.lock().unwrap() = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        *self.fail_delete.lock().unwrap() = fail;
    }

    /// Directly seeds (or overwrites) an entry's raw bytes/flags, bypassing
    /// CAS bookkeeping — used to exercise corruption/unknown-flag scenarios
    /// (spec §8 S4, S5) without going through the protocol first.
    pub fn corrupt(&self, key: &CacheKey, value: Vec<u8>, flags: u32) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.item.value = value;
            entry.item.flags = crate::flags::Flags::from_raw(flags);
        }
    }

    fn next_token(&self) -> CasToken {
        let gen = self.next_generation.fetch_add(1, Ordering::Relaxed);
        CasToken(gen.to_be_bytes().to_vec())
    }
}

#[async_trait]
impl SharedCache for StubSharedCache {
    async fn get_multi(
        &self,
        keys: &[CacheKey],
    ) -> Result<HashMap<CacheKey, CacheItem>, CacheRpcError> {
        if *self.fail_get.lock().unwrap() {
            return Err(CacheRpcError::Rpc("forced get failure".into()));
        }

        let entries = self.entries.lock().unwrap();
        let mut out = HashMap::new();
        for key in keys {
            if let Some(entry) = entries.get(key) {
                if entry.is_live() {
                    let mut item = entry.item.clone();
                    item.cas_token = Some(CasToken(entry.generation.to_be_bytes().to_vec()));
                    out.insert(key.clone(), item);
                }
            }
        }
        Ok(out)
    }

    async fn add_multi(
        &self,
        items: Vec<(CacheKey, CacheItem)>,
    ) -> Vec<Result<CasToken, CacheRpcError>> {
        if *self.fail_add.lock().unwrap() {
            return vec![Err(CacheRpcError::Rpc("forced add failure".into())); items.len()];
        }

        let mut entries = self.entries.lock().unwrap();
        items
            .into_iter()
            .map(|(key, item)| {
                let occupied = entries.get(&key).is_some_and(Entry::is_live);
                if occupied {
                    return Err(CacheRpcError::Rpc(format!("key already present: {key:?}")));
                }
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                entries.insert(
                    key,
                    Entry { item, generation, installed_at: Instant::now() },
                );
                Ok(CasToken(generation.to_be_bytes().to_vec()))
            })
            .collect()
    }

    async fn set_multi(&self, items: Vec<(CacheKey, CacheItem)>) -> Vec<Result<(), CacheRpcError>> {
        if *self.fail_set.lock().unwrap() {
            return vec![Err(CacheRpcError::Rpc("forced set failure".into())); items.len()];
        }

        let mut entries = self.entries.lock().unwrap();
        items
            .into_iter()
            .map(|(key, item)| {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                entries.insert(
                    key,
                    Entry { item, generation, installed_at: Instant::now() },
                );
                Ok(())
            })
            .collect()
    }

    async fn compare_and_swap_multi(
        &self,
        items: Vec<(CacheKey, CacheItem)>,
    ) -> Vec<Result<(), CacheRpcError>> {
        if *self.fail_cas.lock().unwrap() {
            return vec![Err(CacheRpcError::Rpc("forced cas failure".into())); items.len()];
        }

        let mut entries = self.entries.lock().unwrap();
        items
            .into_iter()
            .map(|(key, item)| {
                let expected = item
                    .cas_token
                    .as_ref()
                    .map(|t| u64::from_be_bytes(t.0.clone().try_into().unwrap_or_default()));
                let current_matches = match (expected, entries.get(&key)) {
                    (Some(expected_gen), Some(entry)) => entry.generation == expected_gen && entry.is_live(),
                    _ => false,
                };
                if !current_matches {
                    return Err(CacheRpcError::Rpc("cas token mismatch".into()));
                }
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                entries.insert(
                    key,
                    Entry { item, generation, installed_at: Instant::now() },
                );
                Ok(())
            })
            .collect()
    }

    async fn delete_multi(&self, keys: &[CacheKey]) -> Vec<Result<(), CacheRpcError>> {
        if *self.fail_delete.lock().unwrap() {
            return vec![Err(CacheRpcError::Rpc("forced delete failure".into())); keys.len()];
        }

        let mut entries = self.entries.lock().unwrap();
        keys.iter()
            .map(|key| {
                entries.remove(key);
                Ok(())
            })
            .collect()
    }
}

/// Long enough that expiry never interferes with a fast unit test.
pub const TEST_TTL: Duration = Duration::from_secs(60);
