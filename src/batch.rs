//! Batch splitter (component C4, spec §4.4).
//!
//! Windows an unbounded input batch into backend-sized chunks. Shape
//! validation (T: Entity, checked at compile time) replaces the original's
//! reflective destination handling — see [`crate::entity::Entity`] and
//! its blanket impl for [`crate::entity::PropertyList`], which together
//! subsume the `RecordSlice<T>` / `RecordPointerSlice<T>` / `PropertyListSlice`
//! distinction from the design notes (spec §9).

use crate::error::Error;

/// Splits `total` items into consecutive windows of at most `window` items.
pub fn window_bounds(total: usize, window: usize) -> impl Iterator<Item = (usize, usize)> {
    let window = window.max(1);
    (0..total).step_by(window).map(move |start| (start, (start + window).min(total)))
}

/// Validates that a key slice and a destination slice have equal length
/// before splitting (spec §4.4, "Validation before splitting").
pub fn validate_lengths(keys_len: usize, dst_len: usize) -> Result<(), Error> {
    if keys_len != dst_len {
        return Err(Error::Argument(format!(
            "key and destination slices have different length ({keys_len} vs {dst_len})"
        )));
    }
    Ok(())
}
