use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::SyncError;

/// Read side of the persistence layer: the highest block stored for a channel
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// `channel_key` is the channel genesis hash when the network provides one
    async fn current_block_height(
        &self,
        network_id: &str,
        channel_key: &str,
    ) -> Result<Option<u64>, SyncError>;
}

/// Height a subscription resumes from given the last stored height.
///
/// Steps back one block so a block processed just before a crash, but not yet
/// durably recorded, is delivered again. Never resumes below block 1; block 0 is
/// ingested elsewhere.
pub fn resume_height(last_height: Option<u64>) -> u64 {
    last_height.unwrap_or(0).saturating_sub(1).max(1)
}

#[derive(Clone)]
pub struct CheckpointResolver {
    store: Arc<dyn CheckpointStore>,
}

impl CheckpointResolver {
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Resume height for (network, channel). A failed lookup is treated as a fresh sync.
    pub async fn resolve_resume_height(&self, network_id: &str, channel_key: &str) -> u64 {
        let last_height = match self.store.current_block_height(network_id, channel_key).await {
            Ok(height) => height,
            Err(e) => {
                warn!(
                    "Could not read checkpoint for {}/{}, resyncing from the start: {}",
                    network_id, channel_key, e
                );
                None
            }
        };

        let resume = resume_height(last_height);
        debug!(
            "Checkpoint for {}/{}: last={:?}, resume={}",
            network_id, channel_key, last_height, resume
        );
        resume
    }
}
