use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use distq_core::{MessageKind, PeerQ};
use parking_lot::{Mutex, MutexGuard};

use crate::ids::PeerId;
use crate::quota::Quota;

/// One delivered message, reconstructed from a [`distq_core::Node`] plus
/// (for payloads) the out-of-band bytes it was tagged with.
#[derive(Debug)]
pub struct Delivery {
    pub kind: MessageKind,
    pub subject_id: u64,
    pub payload: Option<Vec<u8>>,
}

/// A connected process. Wraps one [`PeerQ`] (the ordering engine's view
/// of this peer) with the entry-layer bookkeeping the core treats as an
/// external collaborator: a quota, and a table of in-flight payload
/// bytes keyed by message id.
///
/// `outer` is this peer's entry-layer critical-section lock, distinct
/// from the queue's own internal locking — it serializes operations that
/// touch more than one of this peer's own fields at once (e.g. a handle
/// transfer needs both ends' `outer` lock, acquired via [`lock_pair`]).
pub struct Peer {
    id: PeerId,
    queue: Arc<PeerQ>,
    quota: Quota,
    payloads: DashMap<u64, Vec<u8>>,
    outer: Mutex<()>,
}

impl Peer {
    pub(crate) fn new(id: PeerId, quota_ceiling: u64) -> Self {
        Self {
            id,
            queue: Arc::new(PeerQ::new()),
            quota: Quota::new(quota_ceiling),
            payloads: DashMap::new(),
            outer: Mutex::new(()),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn queue(&self) -> &Arc<PeerQ> {
        &self.queue
    }

    pub fn quota(&self) -> &Quota {
        &self.quota
    }

    pub(crate) fn stash_payload(&self, message_id: u64, bytes: Vec<u8>) {
        self.payloads.insert(message_id, bytes);
    }

    fn take_payload(&self, message_id: u64) -> Option<Vec<u8>> {
        self.payloads.remove(&message_id).map(|(_, bytes)| bytes)
    }

    /// Non-blocking: the next delivery, if one is already settled.
    pub fn try_recv(&self) -> Option<Delivery> {
        let node = self.queue.peek()?;
        self.queue.pop(&node);
        let payload = matches!(node.kind(), MessageKind::Payload)
            .then(|| self.take_payload(node.subject_id()))
            .flatten();
        Some(Delivery { kind: node.kind(), subject_id: node.subject_id(), payload })
    }

    /// Block up to `timeout` for the next delivery, or return `None` on
    /// timeout or once this peer's queue has been finalized.
    pub async fn recv_blocking(&self, timeout: Duration) -> Option<Delivery> {
        let node = match tokio::time::timeout(timeout, self.queue.recv()).await {
            Ok(node) => node?,
            Err(_elapsed) => return None,
        };
        let payload = matches!(node.kind(), MessageKind::Payload)
            .then(|| self.take_payload(node.subject_id()))
            .flatten();
        Some(Delivery { kind: node.kind(), subject_id: node.subject_id(), payload })
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Lock both peers' entry-layer critical-section locks in a fixed order
/// (by id) so that two transfers racing in opposite directions between
/// the same pair of peers cannot deadlock.
///
/// Callers must ensure `a.id() != b.id()` — locking the same peer's
/// non-reentrant mutex twice on one thread deadlocks rather than blocking
/// on itself harmlessly.
pub(crate) fn lock_pair<'a>(a: &'a Peer, b: &'a Peer) -> (MutexGuard<'a, ()>, MutexGuard<'a, ()>) {
    debug_assert_ne!(a.id.0, b.id.0, "lock_pair requires two distinct peers");
    if a.id.0 <= b.id.0 {
        let first = a.outer.lock();
        let second = b.outer.lock();
        (first, second)
    } else {
        let first = b.outer.lock();
        let second = a.outer.lock();
        (second, first)
    }
}
