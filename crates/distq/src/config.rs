use clap::Parser;

/// Tunables for a [`crate::system::System`]. Constructed directly by
/// library callers, or via [`Config::parse`] in the demo binary.
#[derive(Parser, Debug, Clone)]
pub struct Config {
    /// Maximum bytes of outstanding payload a single peer may have queued
    /// across all its destinations before `send_payload` starts failing.
    #[arg(long, env = "DISTQ_QUOTA_PER_PEER", default_value_t = 1 << 20)]
    pub quota_per_peer: u64,

    /// Largest single payload a `send_payload` call will accept.
    #[arg(long, env = "DISTQ_MAX_PAYLOAD", default_value_t = 64 * 1024)]
    pub max_payload_len: usize,

    /// Initial capacity hint for the peer/object/handle id tables.
    #[arg(long, env = "DISTQ_TABLE_CAPACITY", default_value_t = 64)]
    pub table_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { quota_per_peer: 1 << 20, max_payload_len: 64 * 1024, table_capacity: 64 }
    }
}
