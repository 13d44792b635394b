use async_trait::async_trait;

use super::SyncError;
use crate::models::{ChannelContext, RawBlock};

/// Downstream pipeline that decodes and stores a delivered block.
///
/// Blocks may be delivered more than once after a restart, so implementations
/// must write idempotently.
#[async_trait]
pub trait BlockProcessor: Send + Sync {
    async fn process_block(&self, context: &ChannelContext, block: &RawBlock) -> Result<(), SyncError>;
}
