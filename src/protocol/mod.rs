//! The coherence protocol (component C5, spec §4.5) — the heart of the
//! crate. GET, PUT, and DELETE each drive the same per-key state machine
//! through the backend seams in `crate::backend`:
//!
//! ```text
//! (absent) --reader ADD--> LOCK_R --store ok + CAS--> ENTITY / NONE
//! (absent) --writer SET--> LOCK_W --store ok--> (lock expires)--> (absent)
//! ENTITY   --writer SET--> LOCK_W --store ok--> (expires) --> (absent)
//! LOCK_R   --writer SET--> LOCK_W  (reader's CAS will fail; safe)
//! LOCK_W   --reader ADD fails--> treat as contended
//! any      --TTL expiry--> (absent)
//! ```
//!
//! A reader never serves a `LOCK_ITEM` as a hit, and never CAS-writes back
//! over a key it observed as contended (spec §3 points 2-5). A writer
//! never writes `ENTITY_ITEM`; invalidation alone is sufficient because
//! the next reader repopulates (spec §4.5 "Why this is correct").

pub mod delete;
pub mod get;
pub mod put;

use rand::RngCore;

/// A caller-unique nonce carried in a lock item's `value`, so two
/// concurrent readers installing locks on the same key never collide in a
/// way that would let one mistake the other's lock for its own (spec §3
/// point 2).
pub(crate) fn lock_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
