#[derive(thiserror::Error, Debug)]
pub enum EntryError {
    #[error("unknown peer {0}")]
    UnknownPeer(u64),
    #[error("unknown object {0}")]
    UnknownObject(u64),
    #[error("unknown handle {0}")]
    UnknownHandle(u64),
    #[error("peer {0} does not own object {1}")]
    NotOwner(u64, u64),
    #[error("object {0} already destroyed")]
    AlreadyDestroyed(u64),
    #[error("peer {peer} quota exceeded: {used} + {requested} > {ceiling}")]
    QuotaExceeded { peer: u64, used: u64, requested: u64, ceiling: u64 },
    #[error("payload too large: {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

pub type Result<T> = core::result::Result<T, EntryError>;
