use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::node::Node;
use crate::timestamp;
use crate::tx::Tx;

/// Landing zone for newly-submitted nodes. `Open` holds whatever arrived
/// since the last drain; `Closed` is the terminal state set by
/// [`PeerQ::finalize`] — once closed, further submissions are discarded.
///
/// A narrow `Mutex<IntakeState>` gives many concurrent producers a lock
/// held only for a `Vec::push`, never the much coarser lock that guards
/// the sorted side. Ordering among nodes that land here is irrelevant to
/// correctness — final order is entirely decided by commit timestamp once
/// sorted — so insertion order does not matter.
enum IntakeState {
    Open(Vec<Arc<Node>>),
    Closed,
}

/// Ready-set entry: compares purely on `key`, never on the node itself, so
/// that two different `Arc<Node>` clones with the same key are
/// interchangeable for lookup/removal purposes.
struct ReadyEntry {
    key: (i64, u64, u64),
    node: Arc<Node>,
}

impl PartialEq for ReadyEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for ReadyEntry {}
impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Receiver-local state: busy (intake nodes whose `Tx` hasn't committed
/// yet) and ready (nodes sorted by commit timestamp), plus `local`, the
/// last clock value this receiver has synchronized to. Mutated only while
/// the peer's outer lock — this mutex — is held, matching §5's "the
/// peek/pop/sort side of a given peer is serialized by that peer's outer
/// lock".
struct Sorted {
    local: i64,
    busy: VecDeque<Arc<Node>>,
    ready: BTreeSet<ReadyEntry>,
}

/// A per-destination queue: lock-free(-ish, see [`IntakeState`]) intake
/// for any number of concurrent senders, plus receiver-local sorted
/// structures consumed by exactly one peek/pop caller at a time.
pub struct PeerQ {
    clock: AtomicI64,
    n_committed: AtomicI64,
    closed: AtomicBool,
    notify: Notify,
    intake: Mutex<IntakeState>,
    sorted: Mutex<Sorted>,
}

impl Default for PeerQ {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerQ {
    pub fn new() -> Self {
        Self {
            clock: AtomicI64::new(0),
            n_committed: AtomicI64::new(0),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
            intake: Mutex::new(IntakeState::Open(Vec::new())),
            sorted: Mutex::new(Sorted {
                local: 0,
                busy: VecDeque::new(),
                ready: BTreeSet::new(),
            }),
        }
    }

    pub fn clock(&self) -> i64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Link `node` into this destination's intake under `tx`. If the
    /// destination has been finalized, the node is silently dropped and
    /// `false` is returned — this is not an error, the sender simply never
    /// hears about it, and the caller must not later call [`PeerQ::commit_node`]
    /// for a node that was dropped here (its `Tx` slot has already been
    /// cleared, so that would violate `commit_node`'s precondition).
    pub(crate) fn submit(&self, node: Arc<Node>, tx: Arc<Tx>) -> bool {
        node.queue(Arc::clone(&tx));
        let mut intake = self.intake.lock();
        match &mut *intake {
            IntakeState::Closed => {
                drop(intake);
                let node_id = node.id();
                node.finalize();
                tracing::trace!(node_id, "message dropped: destination closed");
                false
            }
            IntakeState::Open(nodes) => {
                nodes.push(node);
                drop(intake);
                // Linking happened-before this read (through the intake
                // lock), and this read happens-before the force_sync it
                // feeds: a later commit can only raise `tx.timestamp`
                // further, never invalidate this.
                timestamp::force_sync(tx.timestamp_atomic(), self.clock());
                true
            }
        }
    }

    /// Publish this node's commit to the destination: bump `n_committed`
    /// (the release side of the pair whose acquire side is `poll`/prefetch,
    /// publishing the now-frozen `tx` timestamp), wake one blocked
    /// consumer, and advance `clock` past the transaction's timestamp.
    pub(crate) fn commit_node(&self, tx: &Tx) {
        let prev = self.n_committed.fetch_add(1, Ordering::Release);
        if prev >= 0 {
            self.notify.notify_one();
        }
        let committed = tx.timestamp_word();
        timestamp::force_sync(&self.clock, committed + 1);
    }

    /// True if a committed node is (or recently was) available. A wake
    /// hint, not a queue length — see §4.3's note that `n_committed` can
    /// run transiently negative.
    pub fn poll(&self) -> bool {
        self.n_committed.load(Ordering::Acquire) > 0
    }

    /// Non-blocking: the globally-earliest settled node, or `None` if
    /// nothing is ready yet. Never suspends (§5); blocking consumption is
    /// layered on top via [`PeerQ::recv`].
    pub fn peek(&self) -> Option<Arc<Node>> {
        let mut sorted = self.sorted.lock();
        self.peek_locked(&mut sorted)
    }

    fn peek_locked(&self, sorted: &mut Sorted) -> Option<Arc<Node>> {
        if let Some(first) = sorted.ready.iter().next() {
            if first.key.0 < sorted.local {
                return Some(Arc::clone(&first.node));
            }
        }

        self.prefetch(sorted);

        let head_key = sorted.ready.iter().next()?.key;

        if head_key.0 >= sorted.local {
            let target = head_key.0 + 1;
            sorted.local = target;
            timestamp::force_sync(&self.clock, target);
            self.resync_busy(sorted, target);
        }

        sorted.ready.iter().next().map(|e| Arc::clone(&e.node))
    }

    /// Drain whatever `Tx`s have already committed out of `busy` and into
    /// `ready`, absorbing any intake that landed in between the two
    /// passes (§4.4 step 1).
    fn prefetch(&self, sorted: &mut Sorted) {
        self.drain_committed(sorted, None);

        let mut intake = self.intake.lock();
        if let IntakeState::Open(nodes) = &mut *intake {
            sorted.busy.extend(nodes.drain(..));
        }
        drop(intake);

        self.drain_committed(sorted, None);
    }

    /// Revisit `busy` with `try_sync` against `target`, moving anything
    /// that becomes committed into `ready` (§4.4 step 3). Nodes that stay
    /// uncommitted have their `Tx` forced forward, so whatever timestamp
    /// they eventually commit with is guaranteed `>= target`.
    fn resync_busy(&self, sorted: &mut Sorted, target: i64) {
        self.drain_committed(sorted, Some(target));
    }

    /// Shared core of prefetch/resync: pull each busy node's `Tx`
    /// timestamp forward (if `sync_target` is given) or just read it (if
    /// not), moving newly-committed nodes into `ready`.
    fn drain_committed(&self, sorted: &mut Sorted, sync_target: Option<i64>) {
        let mut remaining = VecDeque::with_capacity(sorted.busy.len());
        while let Some(node) = sorted.busy.pop_front() {
            let Some(tx) = node.tx() else {
                // Finalized out from under us (e.g. a concurrent `finalize`
                // raced the prefetch for the intake half of this node).
                continue;
            };
            let observed = match sync_target {
                Some(target) => tx.try_sync(target),
                None => tx.timestamp_word(),
            };
            if timestamp::is_committed(observed) {
                if node.cached_timestamp() == 0 {
                    node.set_cached_timestamp(observed);
                }
                let key = (node.cached_timestamp(), tx.id(), node.id());
                sorted.ready.insert(ReadyEntry { key, node });
            } else {
                remaining.push_back(node);
            }
        }
        sorted.busy = remaining;
    }

    /// Discard the ready-set head. The caller must pass the node most
    /// recently returned by [`PeerQ::peek`].
    pub fn pop(&self, node: &Arc<Node>) {
        let mut sorted = self.sorted.lock();
        let tx_id = node.tx().map(|tx| tx.id()).unwrap_or(0);
        let key = (node.cached_timestamp(), tx_id, node.id());
        sorted.ready.remove(&ReadyEntry {
            key,
            node: Arc::clone(node),
        });
        drop(sorted);
        self.n_committed.fetch_sub(1, Ordering::Relaxed);
        node.finalize();
    }

    /// Block until a node is available or the queue is finalized.
    /// Enrolls as a waiter before checking `peek`/`closed`, so a commit or
    /// finalize that lands between the check and the wait is never missed.
    pub async fn recv(&self) -> Option<Arc<Node>> {
        loop {
            let notified = self.notify.notified();
            if let Some(node) = self.peek() {
                return Some(node);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// One-shot terminal operation: close intake, splice every node
    /// (intake ∥ busy ∥ ready) into a single list, clear the sorted
    /// structures, and hand the list back for bulk reference release. No
    /// subsequent `peek` returns anything (§8, invariant 5).
    pub fn finalize(&self) -> Vec<Arc<Node>> {
        let taken_intake = {
            let mut intake = self.intake.lock();
            std::mem::replace(&mut *intake, IntakeState::Closed)
        };

        let mut all = match taken_intake {
            IntakeState::Open(nodes) => nodes,
            IntakeState::Closed => Vec::new(),
        };

        {
            let mut sorted = self.sorted.lock();
            all.extend(sorted.busy.drain(..));
            all.extend(std::mem::take(&mut sorted.ready).into_iter().map(|e| e.node));
        }

        for node in &all {
            node.finalize();
        }

        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
        all
    }
}
