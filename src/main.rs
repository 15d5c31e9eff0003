//! Room server executable
//! Usage: voxel-sandbox-server [config.toml]

use anyhow::Context;
use std::sync::Arc;
use voxel_sandbox::network::RoomServer;
use voxel_sandbox::time::SystemClock;
use voxel_sandbox::{load_config, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path).with_context(|| format!("loading config {}", path))?,
        None => {
            log::info!("No config file given, using defaults");
            EngineConfig::default()
        }
    };

    log::info!(
        "Starting room server on {} ({} players per room)",
        config.server.bind_addr,
        config.server.max_players_per_room
    );
    let server = RoomServer::new(config.server, Arc::new(SystemClock));
    server.run().await.context("room server stopped")?;
    Ok(())
}
