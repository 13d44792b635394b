use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::models::{ChannelContext, RawBlock};
use crate::sync::{BlockProcessor, CheckpointStore, SyncError};

mod blocks;
mod migrations;

/// Postgres-backed persistence: checkpoint source and default block archive
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(self) -> Result<Self> {
        migrations::run_migrations(&self.pool).await?;
        Ok(self)
    }
}

#[async_trait]
impl CheckpointStore for Database {
    async fn current_block_height(
        &self,
        network_id: &str,
        channel_key: &str,
    ) -> Result<Option<u64>, SyncError> {
        blocks::get_current_block_number(&self.pool, network_id, channel_key)
            .await
            .map_err(|e| SyncError::Persistence(format!("{:#}", e)))
    }
}

#[async_trait]
impl BlockProcessor for Database {
    async fn process_block(&self, context: &ChannelContext, block: &RawBlock) -> Result<(), SyncError> {
        if blocks::save_raw_block(&self.pool, context, block)
            .await
            .map_err(|e| SyncError::Processing {
                channel: context.channel.clone(),
                block: block.number.as_u64(),
                reason: format!("{:#}", e),
            })?
        {
            info!("Block {} of [{}] stored", block.number, context.channel);
        }
        Ok(())
    }
}
