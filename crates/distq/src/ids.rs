use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

opaque_id!(PeerId);
opaque_id!(ObjectId);
opaque_id!(HandleId);

static NEXT_PEER: AtomicU64 = AtomicU64::new(1);
static NEXT_OBJECT: AtomicU64 = AtomicU64::new(1);
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
static NEXT_MESSAGE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_peer_id() -> PeerId {
    PeerId(NEXT_PEER.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn next_object_id() -> ObjectId {
    ObjectId(NEXT_OBJECT.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn next_handle_id() -> HandleId {
    HandleId(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

/// Tags an in-flight payload so its bytes can be looked up out of band;
/// unrelated to the peer/object/handle id spaces above.
pub(crate) fn next_message_id() -> u64 {
    NEXT_MESSAGE.fetch_add(1, Ordering::Relaxed)
}
