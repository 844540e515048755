use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{EntryError, Result};
use crate::ids::PeerId;

/// Best-effort per-peer resource accounting. The core engine does no
/// quota arithmetic of its own (§7); this is the entry layer's stand-in
/// for the out-of-scope per-user accounting collaborator.
#[derive(Debug)]
pub struct Quota {
    ceiling: u64,
    used: AtomicU64,
}

impl Quota {
    pub fn new(ceiling: u64) -> Self {
        Self { ceiling, used: AtomicU64::new(0) }
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Reserve `amount` against the ceiling, failing without mutating
    /// state if that would exceed it.
    pub fn reserve(&self, peer: PeerId, amount: u64) -> Result<()> {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = cur.checked_add(amount).unwrap_or(u64::MAX);
            if next > self.ceiling {
                return Err(EntryError::QuotaExceeded {
                    peer: peer.0,
                    used: cur,
                    requested: amount,
                    ceiling: self.ceiling,
                });
            }
            match self.used.compare_exchange_weak(
                cur,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => cur = observed,
            }
        }
    }

    /// Release a prior reservation. Saturates at zero so a double-release
    /// (a bug elsewhere) cannot wrap the counter around.
    pub fn release(&self, amount: u64) {
        self.used.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
            Some(cur.saturating_sub(amount))
        }).ok();
    }
}
