//! Rampart Node binary
//!
//! Runs the claim core with RocksDB storage and the local admin socket.

use rampart::{RampartConfig, RampartNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rampart_node=info,rampart=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Rampart Node");

    let config = RampartConfig::from_env()?;

    let node = RampartNode::new(config)?;
    node.run().await?;

    Ok(())
}
