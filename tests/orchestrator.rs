mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{FakeLedger, MemoryPersistence};
use fabric_sync::sync::{PlatformKind, Sender, SyncBuilder, SyncError, SyncMessage, SyncOrchestrator};

fn orchestrator(ledger: &Arc<FakeLedger>, persistence: &Arc<MemoryPersistence>) -> SyncOrchestrator {
    SyncOrchestrator::new(
        ledger.clone(),
        persistence.clone(),
        persistence.clone(),
        Sender::detached(),
    )
}

#[tokio::test]
async fn test_initialize_subscribes_every_channel_independently() {
    let ledger = FakeLedger::new("n1", &["c1", "c2", "c3"]);
    ledger.set_unreachable("c2", true);
    let (persistence, _attempts) = MemoryPersistence::new();
    let orchestrator = orchestrator(&ledger, &persistence);

    let report = orchestrator.initialize().await;

    assert_eq!(report.subscribed, vec!["c1", "c3"]);
    assert!(report.already_subscribed.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "c2");
    assert!(matches!(report.failed[0].1, SyncError::Connectivity { .. }));
    assert!(!report.is_complete());
    assert_eq!(orchestrator.hub().registry().channels(), vec!["c1", "c3"]);
}

#[tokio::test]
async fn test_repeated_pass_only_retries_missing_channels() {
    let ledger = FakeLedger::new("n1", &["c1", "c2"]);
    ledger.set_unreachable("c2", true);
    let (persistence, _attempts) = MemoryPersistence::new();
    let orchestrator = orchestrator(&ledger, &persistence);
    orchestrator.initialize().await;

    ledger.set_unreachable("c2", false);
    let report = orchestrator.initialize().await;

    assert_eq!(report.subscribed, vec!["c2"]);
    assert_eq!(report.already_subscribed, vec!["c1"]);
    assert!(report.is_complete());
    assert_eq!(report.total(), 2);
    assert_eq!(ledger.network_for("c1").add_calls().len(), 1);
    assert_eq!(ledger.network_for("c2").add_calls().len(), 1);
}

#[tokio::test]
async fn test_shutdown_disconnects_everything() {
    let ledger = FakeLedger::new("n1", &["c1", "c2"]);
    let (persistence, _attempts) = MemoryPersistence::new();
    let orchestrator = orchestrator(&ledger, &persistence);
    orchestrator.initialize().await;

    assert_eq!(orchestrator.shutdown().await, 2);
    assert!(orchestrator.hub().registry().is_empty());
}

#[tokio::test]
async fn test_builder_rejects_unknown_platform() {
    let (persistence, _attempts) = MemoryPersistence::new();

    let Err(err) = SyncBuilder::build("besu", persistence, Sender::detached()) else {
        panic!("unknown platform accepted");
    };
    assert!(matches!(err, SyncError::UnsupportedPlatform(ref value) if value == "besu"));
}

#[tokio::test]
async fn test_run_requires_initialize() {
    let (persistence, _attempts) = MemoryPersistence::new();
    let mut platform = SyncBuilder::build("fabric", persistence, Sender::detached()).unwrap_or_else(|e| panic!("{}", e));

    let result = platform.run(CancellationToken::new()).await;
    assert!(matches!(result, Err(SyncError::NotInitialized)));
}

#[tokio::test]
async fn test_platform_lifecycle() {
    let ledger = FakeLedger::new("n1", &["c1", "c2"]);
    ledger.set_unreachable("c2", true);
    let (persistence, _attempts) = MemoryPersistence::new();
    let (tx, mut messages) = mpsc::unbounded_channel();

    let mut platform = SyncBuilder::build("fabric", persistence, Sender::from_channel(tx))
        .unwrap_or_else(|e| panic!("{}", e))
        .with_sync_interval(Duration::from_millis(10));
    assert_eq!(platform.kind(), PlatformKind::Fabric);

    let report = platform.initialize(ledger.clone()).await;
    assert_eq!(report.subscribed, vec!["c1"]);
    assert_eq!(
        messages.recv().await.unwrap(),
        SyncMessage::SyncStarted {
            network_id: "n1".to_string(),
            channels: 2
        }
    );

    // The periodic pass picks c2 up once it becomes reachable
    ledger.set_unreachable("c2", false);
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let network = ledger.network_for("c2");
    tokio::spawn(async move {
        common::wait_until(|| !network.add_calls().is_empty()).await;
        trigger.cancel();
    });

    platform.run(shutdown).await.unwrap();

    assert!(platform.orchestrator().is_none());
    assert_eq!(ledger.network_for("c1").removal_attempts(), 1);
    assert_eq!(ledger.network_for("c2").removal_attempts(), 1);
}
