use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use distq_core::{MessageKind, Node, Stage};

use crate::config::Config;
use crate::error::{EntryError, Result};
use crate::handle::Handle;
use crate::ids::{next_handle_id, next_message_id, next_object_id, next_peer_id};
use crate::ids::{HandleId, ObjectId, PeerId};
use crate::object::Object;
use crate::peer::{lock_pair, Delivery, Peer};

/// The id-keyed registry tying peers, objects, and handles together, and
/// the orchestration layer that turns user-facing calls (send, grant,
/// destroy, release, transfer) into staged transactions on top of
/// `distq-core`.
pub struct System {
    peers: DashMap<PeerId, Arc<Peer>>,
    objects: DashMap<ObjectId, Arc<Object>>,
    handles: DashMap<HandleId, Arc<Handle>>,
    /// Which peer's quota to credit back, and by how much, once a given
    /// in-flight payload message is actually consumed by its destination.
    payload_credits: DashMap<u64, (PeerId, u64)>,
    config: Config,
}

impl System {
    pub fn new(config: Config) -> Self {
        Self {
            peers: DashMap::with_capacity(config.table_capacity),
            objects: DashMap::with_capacity(config.table_capacity),
            handles: DashMap::with_capacity(config.table_capacity),
            payload_credits: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn create_peer(&self) -> Arc<Peer> {
        let id = next_peer_id();
        let peer = Arc::new(Peer::new(id, self.config.quota_per_peer));
        self.peers.insert(id, Arc::clone(&peer));
        tracing::info!(peer = id.0, "peer connected");
        peer
    }

    pub fn peer(&self, id: PeerId) -> Result<Arc<Peer>> {
        self.peers.get(&id).map(|e| Arc::clone(&e)).ok_or(EntryError::UnknownPeer(id.0))
    }

    /// Drop a peer from the registry and finalize its queue, waking any
    /// blocked `recv_blocking` callers with `None`.
    pub fn remove_peer(&self, id: PeerId) -> Result<()> {
        let (_, peer) = self.peers.remove(&id).ok_or(EntryError::UnknownPeer(id.0))?;
        peer.queue().finalize();
        tracing::info!(peer = id.0, "peer disconnected");
        Ok(())
    }

    pub fn create_object(&self, owner: PeerId) -> Result<Arc<Object>> {
        self.peer(owner)?;
        let id = next_object_id();
        let object = Arc::new(Object::new(id, owner));
        self.objects.insert(id, Arc::clone(&object));
        Ok(object)
    }

    pub fn object(&self, id: ObjectId) -> Result<Arc<Object>> {
        self.objects.get(&id).map(|e| Arc::clone(&e)).ok_or(EntryError::UnknownObject(id.0))
    }

    pub fn handle(&self, id: HandleId) -> Result<Arc<Handle>> {
        self.handles.get(&id).map(|e| Arc::clone(&e)).ok_or(EntryError::UnknownHandle(id.0))
    }

    /// Mint a fresh handle naming `object`, held by `holder`. Not itself
    /// a message (no `Node` is staged) — a handle only becomes visible to
    /// its holder through whatever out-of-band channel (e.g. a payload
    /// send) told them its id, matching the core's framing of handle
    /// creation as an entry-layer concern with no ordering implications
    /// of its own.
    pub fn grant_handle(&self, object: ObjectId, holder: PeerId) -> Result<Arc<Handle>> {
        let obj = self.object(object)?;
        self.peer(holder)?;
        if obj.is_destroyed() {
            return Err(EntryError::AlreadyDestroyed(object.0));
        }
        let id = next_handle_id();
        let handle = Arc::new(Handle::new(id, object, holder));
        obj.link(id);
        self.handles.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Release one handle without destroying its object. A no-op if the
    /// handle already lost its link to a concurrent destruction.
    pub fn release_handle(&self, handle_id: HandleId) -> Result<()> {
        let handle = self.handle(handle_id)?;
        let obj = self.object(handle.object())?;
        if !obj.unlink(handle_id) {
            return Ok(());
        }
        handle.mark_unlinked();

        let owner_peer = self.peer(obj.owner())?;
        let mut stage = Stage::new(Arc::clone(owner_peer.queue()));
        stage.push(
            Arc::new(Node::new(MessageKind::HandleRelease, handle_id.0)),
            Arc::clone(owner_peer.queue()),
        );
        stage.commit();
        tracing::debug!(handle = handle_id.0, "handle released");
        Ok(())
    }

    /// Destroy an object: atomically take every handle still linked to
    /// it, stage one object-release node (to the owner) plus one
    /// handle-destruction node per outstanding handle (to each holder),
    /// and commit them as a single transaction.
    pub fn destroy_object(&self, object: ObjectId) -> Result<()> {
        let obj = self.object(object)?;
        let owner_peer = self.peer(obj.owner())?;

        let handle_ids = obj.begin_destruction().ok_or(EntryError::AlreadyDestroyed(object.0))?;

        let mut stage = Stage::new(Arc::clone(owner_peer.queue()));
        stage.push(
            Arc::new(Node::new(MessageKind::ObjectRelease, object.0)),
            Arc::clone(owner_peer.queue()),
        );

        for handle_id in &handle_ids {
            let Ok(handle) = self.handle(*handle_id) else { continue };
            handle.mark_unlinked();
            let Ok(holder_peer) = self.peer(handle.holder()) else {
                tracing::warn!(
                    handle = handle_id.0,
                    holder = handle.holder().0,
                    "handle holder already disconnected, nothing to notify"
                );
                continue;
            };
            stage.push(
                Arc::new(Node::new(MessageKind::HandleDestruction, handle_id.0)),
                Arc::clone(holder_peer.queue()),
            );
        }

        stage.commit();
        tracing::info!(object = object.0, handles = handle_ids.len(), "object destroyed");
        Ok(())
    }

    /// Send a payload from `sender` to whichever peer owns the object
    /// `via_handle` names. The quota reservation is credited back to
    /// `sender` once the destination actually consumes the delivery
    /// (via [`System::recv_blocking`]/[`System::try_recv`]), not merely
    /// once it is staged.
    pub fn send_payload(&self, sender: PeerId, via_handle: HandleId, bytes: Vec<u8>) -> Result<()> {
        if bytes.len() > self.config.max_payload_len {
            return Err(EntryError::PayloadTooLarge {
                len: bytes.len(),
                max: self.config.max_payload_len,
            });
        }
        let handle = self.handle(via_handle)?;
        if !handle.is_linked() {
            return Err(EntryError::UnknownHandle(via_handle.0));
        }
        let obj = self.object(handle.object())?;
        let sender_peer = self.peer(sender)?;
        let dest_peer = self.peer(obj.owner())?;

        let len = bytes.len() as u64;
        sender_peer.quota().reserve(sender, len)?;

        let message_id = next_message_id();
        dest_peer.stash_payload(message_id, bytes);
        self.payload_credits.insert(message_id, (sender, len));

        let mut stage = Stage::new(Arc::clone(sender_peer.queue()));
        stage.push(
            Arc::new(Node::new(MessageKind::Payload, message_id)),
            Arc::clone(dest_peer.queue()),
        );
        stage.commit();
        tracing::trace!(sender = sender.0, dest = obj.owner().0, message_id, "payload staged");
        Ok(())
    }

    /// Transfer a handle's holdership from `from` to `to`. Both peers'
    /// entry-layer locks are acquired, in deterministic id order, for the
    /// duration of the repoint so a racing transfer in the opposite
    /// direction cannot interleave.
    ///
    /// `from == to` is short-circuited before any lock is taken: `lock_pair`
    /// acquires one `parking_lot::Mutex` per peer, and locking the same
    /// non-reentrant mutex twice on one thread deadlocks.
    pub fn transfer_handle(&self, from: PeerId, handle_id: HandleId, to: PeerId) -> Result<()> {
        let handle = self.handle(handle_id)?;
        if handle.holder() != from {
            return Err(EntryError::NotOwner(from.0, handle_id.0));
        }
        if from == to {
            return Ok(());
        }
        let from_peer = self.peer(from)?;
        let to_peer = self.peer(to)?;

        let _guards = lock_pair(&from_peer, &to_peer);
        if handle.holder() != from {
            return Err(EntryError::NotOwner(from.0, handle_id.0));
        }
        handle.set_holder(to);
        tracing::debug!(handle = handle_id.0, from = from.0, to = to.0, "handle transferred");
        Ok(())
    }

    fn credit_delivery(&self, delivery: &Delivery) {
        if delivery.kind != MessageKind::Payload {
            return;
        }
        if let Some((_, (sender, len))) = self.payload_credits.remove(&delivery.subject_id) {
            if let Ok(sender_peer) = self.peer(sender) {
                sender_peer.quota().release(len);
            }
        }
    }

    /// Non-blocking receive on behalf of `peer_id`, crediting back any
    /// sender quota a delivered payload had reserved.
    pub fn try_recv(&self, peer_id: PeerId) -> Result<Option<Delivery>> {
        let peer = self.peer(peer_id)?;
        let delivery = peer.try_recv();
        if let Some(d) = &delivery {
            self.credit_delivery(d);
        }
        Ok(delivery)
    }

    /// Blocking receive on behalf of `peer_id`, crediting back any sender
    /// quota a delivered payload had reserved.
    pub async fn recv_blocking(&self, peer_id: PeerId, timeout: Duration) -> Result<Option<Delivery>> {
        let peer = self.peer(peer_id)?;
        let delivery = peer.recv_blocking(timeout).await;
        if let Some(d) = &delivery {
            self.credit_delivery(d);
        }
        Ok(delivery)
    }
}
