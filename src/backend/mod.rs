//! Backend adapter seams (component C3, spec §4.3).
//!
//! Two traits — [`memcache::SharedCache`] and [`store::EntityStore`] — are
//! the only points where the coherence protocol (`protocol/`) talks to the
//! outside world. Each is independently swappable on [`crate::client::Client`]
//! so tests can substitute a stub for either tier without touching the
//! other, per spec.md §4.3 "a requirement for deterministic tests of the
//! protocol branches."

pub mod memcache;
pub mod store;
