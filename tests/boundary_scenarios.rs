//! Literal end-to-end boundary scenarios, driven through the public
//! `Client` façade with both backend seams stubbed (spec §8 S1-S7).

use std::sync::Arc;

mod common;

use nds_cache::backend::memcache::{SharedCache, StubSharedCache};
use nds_cache::backend::store::{EntityStore, StubEntityStore};
use nds_cache::error::{Error, StoreError};
use nds_cache::item::CacheItem;
use nds_cache::key::{derive_cache_key, KEY_VERSION, MAX_CACHE_KEY_LEN};
use nds_cache::{Client, Config, EntityKey, PropertyList, PropertyValue};

fn int_entity(n: i64) -> PropertyList {
    PropertyList::new().set("IntVal", PropertyValue::Int(n))
}

struct Harness {
    client: Client,
    cache: Arc<StubSharedCache>,
    store: Arc<StubEntityStore>,
}

fn harness() -> Harness {
    common::init_tracing();
    let stub_cache = Arc::new(StubSharedCache::new());
    let stub_store = Arc::new(StubEntityStore::new());
    let cache_seam: Arc<dyn SharedCache> = stub_cache.clone();
    let store_seam: Arc<dyn EntityStore> = stub_store.clone();
    let client = Client::builder()
        .shared_cache(cache_seam)
        .entity_store(store_seam)
        .build()
        .expect("both seams supplied");
    Harness { client, cache: stub_cache, store: stub_store }
}

fn derived(key: &EntityKey) -> nds_cache::key::CacheKey {
    derive_cache_key(key, KEY_VERSION, MAX_CACHE_KEY_LEN)
}

#[tokio::test]
async fn s1_cold_get_of_two_entities_populates_cache() {
    let h = harness();
    let k1 = EntityKey::numbered("Entity", 1);
    let k2 = EntityKey::numbered("Entity", 2);
    h.store.seed(k1.clone(), int_entity(1));
    h.store.seed(k2.clone(), int_entity(2));

    let mut dst = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1.clone(), k2.clone()], &mut dst).await.unwrap();
    assert_eq!(dst[0], int_entity(1));
    assert_eq!(dst[1], int_entity(2));

    let fetched = h.cache.get_multi(&[derived(&k1), derived(&k2)]).await.unwrap();
    assert_eq!(fetched.len(), 2);
    for item in fetched.values() {
        assert_eq!(item.flags, nds_cache::flags::Flags::EntityItem);
    }
}

#[tokio::test]
async fn s2_warm_get_served_from_cache_while_store_is_down() {
    let h = harness();
    let k1 = EntityKey::numbered("Entity", 1);
    let k2 = EntityKey::numbered("Entity", 2);
    h.store.seed(k1.clone(), int_entity(1));
    h.store.seed(k2.clone(), int_entity(2));

    let mut warm = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1.clone(), k2.clone()], &mut warm).await.unwrap();

    h.store.fail_get_with(StoreError::Timeout);
    let mut dst = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1, k2], &mut dst).await.unwrap();
    assert_eq!(dst[0], int_entity(1));
    assert_eq!(dst[1], int_entity(2));
}

#[tokio::test]
async fn s3_negative_cache_survives_store_outage() {
    let h = harness();
    let k = EntityKey::numbered("Entity", 999);

    let mut dst = vec![PropertyList::new()];
    let result = h.client.get_multi(&[k.clone()], &mut dst).await;
    assert!(matches!(result, Err(Error::Store(StoreError::NotFound))));

    h.store.fail_get_with(StoreError::Timeout);
    let mut dst2 = vec![PropertyList::new()];
    let result2 = h.client.get_multi(&[k], &mut dst2).await;
    assert!(matches!(result2, Err(Error::Store(StoreError::NotFound))));
}

#[tokio::test]
async fn s4_corrupted_cache_value_falls_back_to_store() {
    let h = harness();
    let k1 = EntityKey::numbered("Entity", 1);
    let k2 = EntityKey::numbered("Entity", 2);
    h.store.seed(k1.clone(), int_entity(1));
    h.store.seed(k2.clone(), int_entity(2));

    let mut warm = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1.clone(), k2.clone()], &mut warm).await.unwrap();

    h.cache.corrupt(&derived(&k2), b"corrupt string".to_vec(), nds_cache::flags::ENTITY_ITEM);

    let mut dst = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1, k2], &mut dst).await.unwrap();
    assert_eq!(dst[0], int_entity(1));
    assert_eq!(dst[1], int_entity(2));
}

#[tokio::test]
async fn s5_unknown_flag_falls_back_to_store() {
    let h = harness();
    let k1 = EntityKey::numbered("Entity", 1);
    let k2 = EntityKey::numbered("Entity", 2);
    h.store.seed(k1.clone(), int_entity(1));
    h.store.seed(k2.clone(), int_entity(2));

    let mut warm = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1.clone(), k2.clone()], &mut warm).await.unwrap();

    h.cache.corrupt(&derived(&k1), vec![0u8], 23);
    h.cache.corrupt(&derived(&k2), vec![0u8], 23);

    let mut dst = vec![PropertyList::new(), PropertyList::new()];
    h.client.get_multi(&[k1, k2], &mut dst).await.unwrap();
    assert_eq!(dst[0], int_entity(1));
    assert_eq!(dst[1], int_entity(2));
}

#[tokio::test]
async fn s6_writer_wins_race_against_in_flight_reader() {
    let h = harness();
    let k = EntityKey::numbered("Entity", 1);
    h.store.seed(k.clone(), int_entity(1));

    // Thread A's R2 lock, installed before B's write lands.
    h.cache
        .set_multi(vec![(derived(&k), CacheItem::lock(b"reader-a", Config::default().lock_ttl_read))])
        .await;

    // Thread B: PutMulti completes (W1 overwrites A's lock, W2 commits).
    h.client.put(&k, &int_entity(5)).await.unwrap();

    // A's R3 now reads the post-write value from the store; A's R4 CAS
    // against its stale token fails silently.
    let mut dst = vec![PropertyList::new()];
    h.client.get_multi(&[k.clone()], &mut dst).await.unwrap();
    assert_eq!(dst[0], int_entity(5));
}

#[tokio::test]
async fn s7_store_multi_error_passes_through_without_repopulating_cache() {
    let h = harness();
    let k1 = EntityKey::numbered("Entity", 1);
    let k2 = EntityKey::numbered("Entity", 2);
    h.store.fail_get_with(StoreError::Rpc("unavailable".into()));

    let mut dst = vec![PropertyList::new(), PropertyList::new()];
    let result = h.client.get_multi(&[k1.clone(), k2.clone()], &mut dst).await;
    match result {
        Err(Error::Multi(multi)) => {
            assert_eq!(multi.0.len(), 2);
            assert!(multi.0.iter().all(Option::is_some));
        }
        other => panic!("expected Err(Error::Multi(..)), got {other:?}"),
    }

    let fetched = h.cache.get_multi(&[derived(&k1), derived(&k2)]).await.unwrap();
    assert!(fetched.is_empty(), "failed store reads must not repopulate the cache");
}
