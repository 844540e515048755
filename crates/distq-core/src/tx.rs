use std::sync::atomic::{AtomicI64, Ordering};

use crate::ids::next_id;
use crate::timestamp;

/// The shared commit record for one send operation. Every `Node` produced
/// by a single `Stage::commit` call references the same `Tx`; its frozen
/// timestamp is the one ordering fact every receiver agrees on.
///
/// `Tx` stays unaware of how many `Node`s reference it: `Arc` already gives
/// it the lifecycle of "freed the instant the last reference drops",
/// callers just hold `Arc<Tx>`.
#[derive(Debug)]
pub struct Tx {
    id: u64,
    timestamp: AtomicI64,
}

impl Tx {
    pub(crate) fn new() -> Self {
        Self {
            id: next_id(),
            timestamp: AtomicI64::new(0),
        }
    }

    /// Process-wide identity, used as a tie-breaker in the ready-set
    /// ordering key (§4.1).
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn timestamp_atomic(&self) -> &AtomicI64 {
        &self.timestamp
    }

    /// The raw timestamp word as currently observed: odd once committed,
    /// even (and possibly still rising) until then.
    pub(crate) fn timestamp_word(&self) -> i64 {
        self.timestamp.load(Ordering::Acquire)
    }

    pub(crate) fn try_sync(&self, to: i64) -> i64 {
        timestamp::try_sync(&self.timestamp, to)
    }

    /// Freeze this transaction's timestamp to at least `sender_clock`, then
    /// mark it committed. After this call the timestamp never changes
    /// again. Returns the committed (odd) value.
    pub(crate) fn commit(&self, sender_clock: i64) -> i64 {
        timestamp::force_sync(&self.timestamp, sender_clock);
        self.timestamp.fetch_add(1, Ordering::Release) + 1
    }

    /// The committed (odd) timestamp, if this transaction has settled yet.
    pub fn committed_timestamp(&self) -> Option<i64> {
        let v = self.timestamp.load(Ordering::Acquire);
        timestamp::is_committed(v).then_some(v)
    }
}
