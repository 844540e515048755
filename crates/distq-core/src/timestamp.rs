use std::sync::atomic::{AtomicI64, Ordering};

/// Bit 0 marks a timestamp as committed (frozen); bits 1.. carry the
/// logical clock value. A clock only ever advances in steps of 2, so it
/// never collides with the committed form of any value it produces.
const COMMITTED_BIT: i64 = 1;

pub(crate) fn is_committed(v: i64) -> bool {
    v & COMMITTED_BIT != 0
}

/// Raise `ts` to at least `to`, unless `ts` is already committed. `to` must
/// be even; a `to` that would exceed an already-committed value is a
/// precondition bug in the caller, not something this function checks for
/// (it only needs to tolerate the race of `ts` becoming committed
/// concurrently, which it does by giving up as soon as it observes that).
///
/// Relaxed throughout: a timestamp never publishes associated state by
/// itself. Whatever it orders against (the `Tx`/`Node` it lives on) is
/// published separately, by the release/acquire pairs in `peerq`.
pub(crate) fn force_sync(ts: &AtomicI64, to: i64) {
    debug_assert_eq!(to & COMMITTED_BIT, 0, "force_sync target must be even");
    let mut cur = ts.load(Ordering::Relaxed);
    loop {
        if is_committed(cur) || cur >= to {
            return;
        }
        match ts.compare_exchange_weak(cur, to, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(observed) => cur = observed,
        }
    }
}

/// Same as `force_sync`, but returns the value of `ts` observed after the
/// operation (the committed value, if it was or became committed; `to`
/// otherwise).
pub(crate) fn try_sync(ts: &AtomicI64, to: i64) -> i64 {
    debug_assert_eq!(to & COMMITTED_BIT, 0, "try_sync target must be even");
    let mut cur = ts.load(Ordering::Relaxed);
    loop {
        if is_committed(cur) || cur >= to {
            return cur;
        }
        match ts.compare_exchange_weak(cur, to, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return to,
            Err(observed) => cur = observed,
        }
    }
}
