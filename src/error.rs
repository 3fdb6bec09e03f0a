//! Unified error handling (component C6, spec §7).
//!
//! Cache-tier errors never surface here: RPC failure, CAS mismatch, decode
//! failure, and unknown-flag are all swallowed by the protocol and never
//! constructed as an [`Error`] variant. Only argument errors and store-tier
//! errors reach the caller.

use thiserror::Error;

/// A per-index outcome from the entity store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// First-class outcome, not merely the absence of an error (spec §7).
    #[error("entity not found")]
    NotFound,
    #[error("store rpc failed: {0}")]
    Rpc(String),
    #[error("deadline exceeded")]
    Timeout,
}

/// A per-index outcome from the shared cache. Never escapes this crate as
/// a public [`Error`] — it only drives internal degrade-to-store logic.
#[derive(Debug, Clone, Error)]
pub enum CacheRpcError {
    #[error("cache rpc failed: {0}")]
    Rpc(String),
    #[error("deadline exceeded")]
    Timeout,
}

/// A per-input-index error vector whose length always equals the caller's
/// batch length, preserving input index (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct MultiError(pub Vec<Option<StoreError>>);

impl MultiError {
    /// `true` when every slot is `None` — collapses to no top-level error.
    pub fn is_nil(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Concatenates window-scoped error vectors in order, for the batch
    /// splitter (spec §4.4).
    pub fn merge(chunks: Vec<MultiError>) -> MultiError {
        let mut merged = Vec::new();
        for chunk in chunks {
            merged.extend(chunk.0);
        }
        MultiError(merged)
    }

    /// Applies `err` (from a single whole-call failure) to every index in
    /// `len`, per "a single non-per-index error from any tier populates
    /// every index belonging to that tier's call" (spec §4.6).
    pub fn whole_call(err: StoreError, len: usize) -> MultiError {
        MultiError(vec![Some(err); len])
    }
}

impl std::fmt::Display for MultiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let failed = self.0.iter().filter(|e| e.is_some()).count();
        write!(f, "{failed} of {} batch operations failed", self.0.len())
    }
}

impl std::error::Error for MultiError {}

/// The top-level error returned by public [`crate::client::Client`] operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Shape/type/length mismatch, incomplete key where disallowed. Always
    /// surfaced; never cached (spec §7).
    #[error("argument error: {0}")]
    Argument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Multi(#[from] MultiError),
}

pub type Result<T> = std::result::Result<T, Error>;
