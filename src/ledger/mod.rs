//! Ledger network collaborator seams.
//!
//! The sync core never talks to a ledger directly. It asks a [`LedgerClient`] for the
//! channels it knows and for a per-channel [`ChannelNetwork`] handle, and subscribes
//! to blocks through that handle. A subscription is a [`BlockStream`]: the listener id
//! used to remove it later plus an ordered queue of delivered blocks.

pub mod gateway;
pub mod profile;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::models::{ListenerOptions, RawBlock};
use crate::sync::SyncError;

pub use gateway::GatewayClient;
pub use profile::{ChannelProfile, NetworkProfile};

/// Identifier of one registered block listener, unique per network handle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A live block subscription. Blocks arrive on `events` in delivery order; the
/// stream ends when the listener is removed or the ledger side closes it.
#[derive(Debug)]
pub struct BlockStream {
    pub listener_id: ListenerId,
    pub events: mpsc::Receiver<RawBlock>,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    fn network_id(&self) -> &str;

    /// All channel names this client is configured for
    fn channels(&self) -> Vec<String>;

    fn channel_genesis_hash(&self, channel: &str) -> Option<String>;

    /// Fails with [`SyncError::Connectivity`] when the channel cannot be reached
    async fn network(&self, channel: &str) -> Result<Arc<dyn ChannelNetwork>, SyncError>;
}

#[async_trait]
pub trait ChannelNetwork: Send + Sync {
    async fn add_block_listener(&self, options: ListenerOptions) -> Result<BlockStream, SyncError>;

    async fn remove_block_listener(&self, listener_id: ListenerId) -> Result<(), SyncError>;
}
