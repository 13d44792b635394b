use anyhow::Result;
use sqlx::PgPool;
use tracing::{error, info};

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    info!("Running database migrations");

    // One row per (network, channel, block); the key makes re-delivery idempotent
    let create_blocks_table = r#"
    CREATE TABLE IF NOT EXISTS blocks (
        network_name TEXT NOT NULL,
        channel_genesis_hash TEXT NOT NULL,
        blocknum BIGINT NOT NULL,
        payload BYTEA NOT NULL,
        payload_size BIGINT NOT NULL,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (network_name, channel_genesis_hash, blocknum)
    )
    "#;

    // Checkpoint lookups read the highest blocknum per channel
    let create_blocknum_index = r#"
    CREATE INDEX IF NOT EXISTS idx_blocks_channel_blocknum_desc
    ON blocks (network_name, channel_genesis_hash, blocknum DESC)
    "#;

    info!("Creating blocks table if it doesn't exist");
    sqlx::query(create_blocks_table)
        .execute(pool)
        .await
        .map_err(|e| {
            error!("Failed to create blocks table: {}", e);
            e
        })?;

    info!("Creating channel blocknum index");
    sqlx::query(create_blocknum_index)
        .execute(pool)
        .await
        .map_err(|e| {
            error!("Failed to create channel blocknum index: {}", e);
            e
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}
