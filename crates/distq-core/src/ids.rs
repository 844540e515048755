use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A process-wide, monotonically increasing identity. Used only to break
/// ties in the ready-set ordering key (§4.1): two transactions committed
/// "at the same time" by racing threads still need a deterministic order
/// that every receiver agrees on. Never reused, never compared across
/// process restarts.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}
