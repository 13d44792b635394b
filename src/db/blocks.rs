use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::{debug, error, instrument};

use crate::models::{ChannelContext, RawBlock};

/// Store a delivered block. Re-delivered blocks are ignored, so replays after a restart are harmless.
#[instrument(skip(pool, block), fields(channel = %context.channel, block_number = block.number.as_u64()))]
pub async fn save_raw_block(pool: &PgPool, context: &ChannelContext, block: &RawBlock) -> Result<bool> {
    debug!("Saving block {} of [{}] to database", block.number, context.channel);

    let query = r#"
    INSERT INTO blocks (network_name, channel_genesis_hash, blocknum, payload, payload_size)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (network_name, channel_genesis_hash, blocknum) DO NOTHING
    "#;

    let blocknum = i64::try_from(block.number.as_u64())
        .context("Block number does not fit the blocknum column")?;

    let result = sqlx::query(query)
        .bind(&context.network_id)
        .bind(context.checkpoint_key())
        .bind(blocknum)
        .bind(&block.payload)
        .bind(block.payload.len() as i64)
        .execute(pool)
        .await;

    match result {
        Ok(done) => {
            let inserted = done.rows_affected() > 0;
            if !inserted {
                debug!("Block {} of [{}] was already stored", block.number, context.channel);
            }
            Ok(inserted)
        }
        Err(e) => {
            error!("Failed to save block {} of [{}]: {}", block.number, context.channel, e);
            Err(e.into())
        }
    }
}

#[instrument(skip(pool))]
pub async fn get_current_block_number(
    pool: &PgPool,
    network_name: &str,
    channel_genesis_hash: &str,
) -> Result<Option<u64>> {
    debug!("Fetching current block number for {}/{}", network_name, channel_genesis_hash);

    let query = r#"
    SELECT MAX(blocknum) AS blocknum FROM blocks
    WHERE network_name = $1 AND channel_genesis_hash = $2
    "#;

    let row = sqlx::query(query)
        .bind(network_name)
        .bind(channel_genesis_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            error!("Failed to get current block number: {}", e);
            e
        })?;

    let blocknum: Option<i64> = row.try_get("blocknum")?;
    Ok(blocknum.map(|n| n as u64))
}
