use std::sync::Arc;

use crate::node::Node;
use crate::peerq::PeerQ;
use crate::tx::Tx;

/// Accumulates the nodes produced by one send operation before committing
/// them as a single transaction. `sender` is the stage's *owning* peer —
/// its clock is what the shared `Tx` gets force-synced to at commit time
/// (§4.2), independently of whatever destinations the individual nodes
/// are headed to.
///
/// The `Tx` is created once, up front, and shared by every node pushed
/// onto the stage; each is already heap-allocated behind an `Arc`, so
/// there is no need to delay allocating it until commit time.
pub struct Stage {
    sender: Arc<PeerQ>,
    tx: Arc<Tx>,
    items: Vec<(Arc<Node>, Arc<PeerQ>)>,
}

impl Stage {
    pub fn new(sender: Arc<PeerQ>) -> Self {
        Self {
            sender,
            tx: Arc::new(Tx::new()),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The transaction this stage will commit under. Exposed so entry-layer
    /// collaborators (e.g. when flushing an object's handle list, §4.5) can
    /// tag their own bookkeeping with it before `commit` runs.
    pub fn tx(&self) -> &Arc<Tx> {
        &self.tx
    }

    /// Accumulate one node destined to `dest`. The node must not already
    /// carry a `Tx` — that precondition is enforced, in debug builds, by
    /// [`Node::queue`] at commit time.
    pub fn push(&mut self, node: Arc<Node>, dest: Arc<PeerQ>) {
        self.items.push((node, dest));
    }

    /// Submit, commit-transaction, and commit-nodes, in that order. A
    /// no-op on an empty stage.
    ///
    /// How long another thread can observe some of this transaction's
    /// nodes committed and others not is bounded by how much work runs
    /// between the transaction freezing and the last destination's
    /// commit-nodes call. None of the three phases below ever suspends —
    /// there is no `.await` and no blocking lock held across them — so
    /// that window is already as small as a single thread's uninterrupted
    /// instruction stream makes it; no additional lock needs to be held
    /// across destinations to get the same bound.
    pub fn commit(mut self) {
        if self.items.is_empty() {
            return;
        }

        let linked: Vec<bool> = self
            .items
            .iter()
            .map(|(node, dest)| dest.submit(Arc::clone(node), Arc::clone(&self.tx)))
            .collect();

        let sender_clock = self.sender.clock();
        self.tx.commit(sender_clock);

        for ((_, dest), was_linked) in self.items.drain(..).zip(linked) {
            if was_linked {
                dest.commit_node(&self.tx);
            }
        }
    }
}
