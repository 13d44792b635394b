use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub platform: String,
    pub network_profile: String,
    pub sync_interval_secs: u64,
    pub block_queue_size: usize,
    pub db_max_connections: u32,
    pub ipc_enabled: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        let _ = dotenv::dotenv();

        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let platform = env::var("SYNC_PLATFORM")
            .unwrap_or_else(|_| "fabric".to_string());

        let network_profile = env::var("NETWORK_PROFILE")
            .unwrap_or_else(|_| "config/network.toml".to_string());

        let sync_interval_secs = env::var("SYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("SYNC_INTERVAL_SECS must be a valid number")?;

        let block_queue_size = env::var("BLOCK_QUEUE_SIZE")
            .unwrap_or_else(|_| "100".to_string()) // Blocks buffered per channel
            .parse()
            .context("BLOCK_QUEUE_SIZE must be a valid number")?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let ipc_enabled = env::var("SYNC_IPC")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .context("SYNC_IPC must be true or false")?;

        let config = Config {
            database_url,
            platform,
            network_profile,
            sync_interval_secs,
            block_queue_size,
            db_max_connections,
            ipc_enabled,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.sync_interval_secs > 0, "SYNC_INTERVAL_SECS must be greater than 0");
        anyhow::ensure!(self.block_queue_size > 0, "BLOCK_QUEUE_SIZE must be greater than 0");
        anyhow::ensure!(self.db_max_connections > 0, "DB_MAX_CONNECTIONS must be greater than 0");
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }
}
