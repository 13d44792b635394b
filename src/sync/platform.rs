use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::builder::PlatformKind;
use super::checkpoint::CheckpointStore;
use super::orchestrator::{SyncOrchestrator, SyncReport};
use super::processor::BlockProcessor;
use super::sender::{Sender, SyncMessage};
use super::SyncError;
use crate::ledger::LedgerClient;

const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// A configured sync implementation, ready to be attached to a ledger client
pub struct SyncPlatform {
    kind: PlatformKind,
    checkpoints: Arc<dyn CheckpointStore>,
    processor: Arc<dyn BlockProcessor>,
    sender: Sender,
    sync_interval: Duration,
    orchestrator: Option<SyncOrchestrator>,
}

impl SyncPlatform {
    pub fn new(
        kind: PlatformKind,
        checkpoints: Arc<dyn CheckpointStore>,
        processor: Arc<dyn BlockProcessor>,
        sender: Sender,
    ) -> Self {
        Self {
            kind,
            checkpoints,
            processor,
            sender,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            orchestrator: None,
        }
    }

    /// Configure how often channels are re-checked and resubscribed
    pub fn with_sync_interval(mut self, sync_interval: Duration) -> Self {
        // tokio intervals reject a zero period
        self.sync_interval = sync_interval.max(Duration::from_millis(1));
        self
    }

    pub fn kind(&self) -> PlatformKind {
        self.kind
    }

    pub fn orchestrator(&self) -> Option<&SyncOrchestrator> {
        self.orchestrator.as_ref()
    }

    /// Attach to `client` and bring every channel up once.
    /// Calling it again replaces the orchestrator after tearing down the old one.
    pub async fn initialize(&mut self, client: Arc<dyn LedgerClient>) -> SyncReport {
        if let Some(previous) = self.orchestrator.take() {
            previous.shutdown().await;
        }

        info!("Initializing {} sync for network {}", self.kind, client.network_id());
        let network_id = client.network_id().to_string();
        let orchestrator = SyncOrchestrator::new(
            client,
            self.checkpoints.clone(),
            self.processor.clone(),
            self.sender.clone(),
        );

        let report = orchestrator.initialize().await;
        self.sender.send(SyncMessage::SyncStarted {
            network_id,
            channels: report.total(),
        });

        self.orchestrator = Some(orchestrator);
        report
    }

    /// Re-run the sync pass every interval until `shutdown` fires, then disconnect everything
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), SyncError> {
        let orchestrator = self.orchestrator.as_ref().ok_or(SyncError::NotInitialized)?;

        let mut ticker = interval(self.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately and initialize already ran a pass
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping sync");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("Running periodic sync pass");
                    orchestrator.initialize().await;
                }
            }
        }

        self.destroy().await;
        Ok(())
    }

    /// Disconnect every channel and drop the orchestrator
    pub async fn destroy(&mut self) {
        if let Some(orchestrator) = self.orchestrator.take() {
            let disconnected = orchestrator.shutdown().await;
            info!("Sync platform stopped, {} channels disconnected", disconnected);
        }
    }
}
