use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use arc_swap::ArcSwapOption;

use crate::ids::next_id;
use crate::message::MessageKind;
use crate::tx::Tx;

/// One deliverable entry to one destination peer.
///
/// `timestamp` is receiver-local: the protocol only ever reads or writes it
/// while the owning `PeerQ`'s sorted-side lock is held (§4.4), so an
/// `AtomicI64` is used here purely so `Node` can be `Send + Sync` without
/// a separate lock, not because concurrent access is expected.
///
/// `PeerQ` holds `Arc<Node>` clones in ordinary `Vec`/`VecDeque`/`BTreeSet`
/// containers as it moves a node between intake, busy, and ready: Rust
/// ownership of those clones already encodes "queued xor ready xor
/// finalized" as a structural fact about which container holds the node,
/// so there is nothing left for the node itself to track.
#[derive(Debug)]
pub struct Node {
    id: u64,
    userdata: MessageKind,
    subject_id: u64,
    timestamp: AtomicI64,
    tx: ArcSwapOption<Tx>,
}

impl Node {
    /// `subject_id` identifies what this message concerns to the receiver
    /// (an object id, a handle id, or an opaque message id for a payload
    /// send) — whatever the entry-layer collaborator needs to interpret
    /// the delivery without looking anything up in the sender's tables.
    pub fn new(userdata: MessageKind, subject_id: u64) -> Self {
        Self {
            id: next_id(),
            userdata,
            subject_id,
            timestamp: AtomicI64::new(0),
            tx: ArcSwapOption::empty(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.userdata
    }

    pub fn subject_id(&self) -> u64 {
        self.subject_id
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn cached_timestamp(&self) -> i64 {
        self.timestamp.load(Ordering::Relaxed)
    }

    pub(crate) fn set_cached_timestamp(&self, v: i64) {
        self.timestamp.store(v, Ordering::Relaxed);
    }

    pub(crate) fn tx(&self) -> Option<Arc<Tx>> {
        self.tx.load_full()
    }

    /// Link this node to `tx`. Precondition: the node carries no `Tx` yet
    /// (it has never been queued, or was finalized since). Flagged in
    /// debug builds — this is an implementation bug, not a recoverable
    /// error.
    pub(crate) fn queue(&self, tx: Arc<Tx>) {
        let prev = self.tx.swap(Some(tx));
        debug_assert!(prev.is_none(), "node queued while already carrying a Tx");
    }

    /// Atomically take the `Tx` reference, leaving the node tx-less.
    /// Called once, when the node leaves every queue for the last time
    /// (explicit `pop`, or bulk teardown in `PeerQ::finalize`).
    pub(crate) fn finalize(&self) -> Option<Arc<Tx>> {
        self.tx.swap(None)
    }
}
