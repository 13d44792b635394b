use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fabric_sync::config::Config;
use fabric_sync::db::Database;
use fabric_sync::ledger::{GatewayClient, NetworkProfile};
use fabric_sync::sync::{Sender, SyncBuilder};
use fabric_sync::utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    utils::logger::init_logger(config.ipc_enabled);
    info!("Starting ledger sync");

    let profile = NetworkProfile::load(&config.network_profile)
        .context("Failed to load network profile")?;
    utils::config_logger::log_config(&config, &profile);

    // Initialize database connection
    let db = Database::new(&config.database_url, config.db_max_connections).await?
        .migrate()
        .await?;
    info!("Database connection established and migrations applied");

    let sender = if config.ipc_enabled {
        Sender::stdio()
    } else {
        Sender::detached()
    };

    let client = GatewayClient::new(profile)?
        .with_queue_size(config.block_queue_size);

    let mut platform = SyncBuilder::build(&config.platform, Arc::new(db), sender)?
        .with_sync_interval(config.sync_interval());

    let report = platform.initialize(Arc::new(client)).await;
    for (channel, e) in &report.failed {
        warn!("Channel [{}] not subscribed yet, will retry on the next pass: {}", channel, e);
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        signal.cancel();
    });

    match platform.run(shutdown).await {
        Ok(_) => info!("Ledger sync shutdown gracefully"),
        Err(e) => error!("Ledger sync failed: {}", e),
    }

    Ok(())
}
