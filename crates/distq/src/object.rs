use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::ids::{HandleId, ObjectId, PeerId};

/// State owned by one peer, addressed indirectly through [`crate::handle::Handle`]s.
///
/// Unlike the core's `Node`, this record carries no embedded queue entry
/// of its own — the release/destruction `Node`s it needs are created on
/// demand by [`crate::system::System::destroy_object`], tagged with this
/// object's id as `subject_id`, rather than kept pre-allocated.
#[derive(Debug)]
pub struct Object {
    id: ObjectId,
    owner: PeerId,
    handles: Mutex<Vec<HandleId>>,
    destroyed: AtomicBool,
}

impl Object {
    pub(crate) fn new(id: ObjectId, owner: PeerId) -> Self {
        Self { id, owner, handles: Mutex::new(Vec::new()), destroyed: AtomicBool::new(false) }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner(&self) -> PeerId {
        self.owner
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn link(&self, handle: HandleId) {
        self.handles.lock().push(handle);
    }

    pub(crate) fn unlink(&self, handle: HandleId) -> bool {
        let mut handles = self.handles.lock();
        if let Some(pos) = handles.iter().position(|h| *h == handle) {
            handles.swap_remove(pos);
            true
        } else {
            false
        }
    }

    /// Claim destruction of this object: flips `destroyed` from `false` to
    /// `true` and, only if that flip is the one that wins, takes every
    /// handle still linked to it. Returns `None` if the object was already
    /// destroyed.
    ///
    /// The flip and the check are one `compare_exchange`, so two overlapping
    /// callers racing this same object can never both win — the loser
    /// observes `Err` and gets `None` back without touching `handles`,
    /// rather than both passing a separate `is_destroyed()` precheck and
    /// then both unconditionally taking (and double-staging) the handle list.
    pub(crate) fn begin_destruction(&self) -> Option<Vec<HandleId>> {
        self.destroyed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok()?;
        Some(std::mem::take(&mut *self.handles.lock()))
    }
}
