use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::ids::{HandleId, ObjectId, PeerId};

/// An unforgeable capability naming an [`crate::object::Object`], held by
/// exactly one peer at a time. Holding a handle lets a peer send to the
/// object's owner and pass the handle along to a third peer (transferring
/// the capability, never copying it).
#[derive(Debug)]
pub struct Handle {
    id: HandleId,
    object: ObjectId,
    holder: AtomicU64,
    linked: AtomicBool,
}

impl Handle {
    pub(crate) fn new(id: HandleId, object: ObjectId, holder: PeerId) -> Self {
        Self { id, object, holder: AtomicU64::new(holder.0), linked: AtomicBool::new(true) }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn holder(&self) -> PeerId {
        PeerId(self.holder.load(Ordering::Acquire))
    }

    /// Repoint this handle at a new holder. Called only while both the
    /// old and new holder's entry-layer locks are held (`lock_pair`), so
    /// there is no concurrent reader to race.
    pub(crate) fn set_holder(&self, new_holder: PeerId) {
        self.holder.store(new_holder.0, Ordering::Release);
    }

    pub fn is_linked(&self) -> bool {
        self.linked.load(Ordering::Acquire)
    }

    /// Clear the linked flag. Returns whether this call is the one that
    /// transitioned it (idempotent: a second caller racing a concurrent
    /// destruction observes `false` and knows not to act twice).
    pub(crate) fn mark_unlinked(&self) -> bool {
        self.linked.swap(false, Ordering::AcqRel)
    }
}
