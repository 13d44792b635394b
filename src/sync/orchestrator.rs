use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use super::checkpoint::{CheckpointResolver, CheckpointStore};
use super::event_hub::{ChannelEventHub, SubscribeOutcome};
use super::processor::BlockProcessor;
use super::registry::ListenerRegistry;
use super::sender::Sender;
use super::SyncError;
use crate::ledger::LedgerClient;

/// Per-channel outcome of one orchestrator pass
#[derive(Debug, Default)]
pub struct SyncReport {
    pub subscribed: Vec<String>,
    pub already_subscribed: Vec<String>,
    pub failed: Vec<(String, SyncError)>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.subscribed.len() + self.already_subscribed.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Brings every channel of the network up and owns the listener registry
pub struct SyncOrchestrator {
    client: Arc<dyn LedgerClient>,
    hub: ChannelEventHub,
}

impl SyncOrchestrator {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        checkpoints: Arc<dyn CheckpointStore>,
        processor: Arc<dyn BlockProcessor>,
        sender: Sender,
    ) -> Self {
        let registry = Arc::new(ListenerRegistry::new());
        let hub = ChannelEventHub::new(
            client.clone(),
            CheckpointResolver::new(checkpoints),
            processor,
            sender,
            registry,
        );

        Self { client, hub }
    }

    pub fn hub(&self) -> &ChannelEventHub {
        &self.hub
    }

    /// Ensure a subscription for every channel the client knows.
    /// Channels are handled concurrently and independently; one failure never stops the rest.
    pub async fn initialize(&self) -> SyncReport {
        let channels = self.client.channels();
        info!(
            "Synchronizing {} channels of network {}",
            channels.len(),
            self.client.network_id()
        );

        let outcomes = join_all(channels.iter().map(|channel| self.hub.ensure_subscribed(channel))).await;

        let mut report = SyncReport::default();
        for (channel, outcome) in channels.into_iter().zip(outcomes) {
            match outcome {
                Ok(SubscribeOutcome::Subscribed { .. }) => report.subscribed.push(channel),
                Ok(SubscribeOutcome::AlreadySubscribed) => report.already_subscribed.push(channel),
                Err(e) => report.failed.push((channel, e)),
            }
        }

        if report.is_complete() {
            info!(
                "Sync pass complete: {} new, {} already subscribed",
                report.subscribed.len(),
                report.already_subscribed.len()
            );
        } else {
            warn!(
                "Sync pass incomplete: {} new, {} already subscribed, {} failed",
                report.subscribed.len(),
                report.already_subscribed.len(),
                report.failed.len()
            );
        }
        report
    }

    /// Tear down every subscription
    pub async fn shutdown(&self) -> usize {
        info!("Stopping sync orchestrator");
        self.hub.disconnect_all().await
    }
}
