use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use distq::{Config, System};
use tracing::{info, warn};

/// Runs a small fixed scenario against the `distq` engine: two peers
/// exchange a payload through a granted handle, then the object is
/// destroyed and both sides observe the teardown in the same order.
#[derive(Parser, Debug)]
#[command(version, author, about)]
struct Opts {
    #[command(flatten)]
    config: Config,

    /// How long a peer will wait for a delivery before giving up.
    #[arg(long, value_parser = parse_duration, default_value = "2s", env = "DISTQD_RECV_TIMEOUT")]
    recv_timeout: Duration,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (num, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));
    let value: u64 = num.parse().map_err(|_| format!("invalid duration: {s}"))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" | "" => Ok(Duration::from_secs(value)),
        other => Err(format!("unknown duration unit {other:?}")),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("distqd=info,distq=info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    init_logging();

    let system = System::new(opts.config);

    let owner = system.create_peer();
    let client = system.create_peer();
    info!(owner = owner.id().0, client = client.id().0, "demo peers connected");

    let object = system.create_object(owner.id())?;
    let handle = system.grant_handle(object.id(), client.id())?;
    info!(object = object.id().0, handle = handle.id().0, "handle granted to client");

    system
        .send_payload(client.id(), handle.id(), b"hello from distqd".to_vec())
        .context("sending demo payload")?;

    match system.recv_blocking(owner.id(), opts.recv_timeout).await? {
        Some(delivery) => {
            let text = delivery.payload.as_deref().map(String::from_utf8_lossy);
            info!(?delivery.kind, payload = ?text, "owner received a delivery");
        }
        None => warn!("owner timed out waiting for the payload"),
    }

    system.destroy_object(object.id())?;
    info!(object = object.id().0, "object destroyed");

    match system.recv_blocking(client.id(), opts.recv_timeout).await? {
        Some(delivery) => info!(?delivery.kind, "client observed object teardown"),
        None => warn!("client timed out waiting for the teardown notice"),
    }

    Ok(())
}
