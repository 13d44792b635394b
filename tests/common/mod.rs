#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use fabric_sync::ledger::{BlockStream, ChannelNetwork, LedgerClient, ListenerId};
use fabric_sync::models::{ChannelContext, ListenerOptions, RawBlock};
use fabric_sync::sync::{BlockProcessor, CheckpointStore, SyncError};

pub const WAIT: Duration = Duration::from_secs(2);

/// In-memory ledger: a fixed set of channels, each with its own scripted network
pub struct FakeLedger {
    network_id: String,
    networks: HashMap<String, Arc<FakeNetwork>>,
    genesis_hashes: Mutex<HashMap<String, String>>,
    unreachable: Mutex<HashSet<String>>,
}

impl FakeLedger {
    pub fn new(network_id: &str, channels: &[&str]) -> Arc<Self> {
        let networks = channels
            .iter()
            .map(|c| (c.to_string(), Arc::new(FakeNetwork::new(c))))
            .collect();

        Arc::new(Self {
            network_id: network_id.to_string(),
            networks,
            genesis_hashes: Mutex::new(HashMap::new()),
            unreachable: Mutex::new(HashSet::new()),
        })
    }

    pub fn network_for(&self, channel: &str) -> Arc<FakeNetwork> {
        self.networks[channel].clone()
    }

    pub fn set_genesis_hash(&self, channel: &str, hash: &str) {
        self.genesis_hashes
            .lock()
            .insert(channel.to_string(), hash.to_string());
    }

    pub fn set_unreachable(&self, channel: &str, unreachable: bool) {
        let mut set = self.unreachable.lock();
        if unreachable {
            set.insert(channel.to_string());
        } else {
            set.remove(channel);
        }
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    fn network_id(&self) -> &str {
        &self.network_id
    }

    fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.networks.keys().cloned().collect();
        channels.sort();
        channels
    }

    fn channel_genesis_hash(&self, channel: &str) -> Option<String> {
        self.genesis_hashes.lock().get(channel).cloned()
    }

    async fn network(&self, channel: &str) -> Result<Arc<dyn ChannelNetwork>, SyncError> {
        if self.unreachable.lock().contains(channel) {
            return Err(SyncError::Connectivity {
                channel: channel.to_string(),
                reason: "peer unreachable".to_string(),
            });
        }
        match self.networks.get(channel) {
            Some(network) => Ok(network.clone() as Arc<dyn ChannelNetwork>),
            None => Err(SyncError::Connectivity {
                channel: channel.to_string(),
                reason: "unknown channel".to_string(),
            }),
        }
    }
}

pub struct FakeNetwork {
    channel: String,
    add_calls: Mutex<Vec<ListenerOptions>>,
    removal_attempts: Mutex<Vec<ListenerId>>,
    streams: Mutex<HashMap<ListenerId, mpsc::Sender<RawBlock>>>,
    next_id: AtomicU64,
    fail_add: AtomicBool,
    fail_remove: AtomicBool,
    add_delay_ms: AtomicU64,
}

impl FakeNetwork {
    fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            add_calls: Mutex::new(Vec::new()),
            removal_attempts: Mutex::new(Vec::new()),
            streams: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_add: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            add_delay_ms: AtomicU64::new(0),
        }
    }

    pub fn add_calls(&self) -> Vec<ListenerOptions> {
        self.add_calls.lock().clone()
    }

    pub fn removal_attempts(&self) -> usize {
        self.removal_attempts.lock().len()
    }

    pub fn set_fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn set_add_delay(&self, delay: Duration) {
        self.add_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Push a block to every open listener of this channel
    pub async fn deliver(&self, block: RawBlock) {
        let senders: Vec<_> = self.streams.lock().values().cloned().collect();
        assert!(!senders.is_empty(), "no listener registered on {}", self.channel);
        for sender in senders {
            sender.send(block.clone()).await.expect("listener dropped");
        }
    }

    /// Simulate the ledger side closing every stream
    pub fn close_streams(&self) {
        self.streams.lock().clear();
    }
}

#[async_trait]
impl ChannelNetwork for FakeNetwork {
    async fn add_block_listener(&self, options: ListenerOptions) -> Result<BlockStream, SyncError> {
        self.add_calls.lock().push(options);

        let delay = self.add_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_add.load(Ordering::SeqCst) {
            return Err(SyncError::Subscription {
                channel: self.channel.clone(),
                reason: "listener rejected".to_string(),
            });
        }

        let listener_id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, events) = mpsc::channel(16);
        self.streams.lock().insert(listener_id, sender);
        Ok(BlockStream { listener_id, events })
    }

    async fn remove_block_listener(&self, listener_id: ListenerId) -> Result<(), SyncError> {
        self.removal_attempts.lock().push(listener_id);

        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(SyncError::ListenerRemoval {
                channel: self.channel.clone(),
                reason: "peer refused".to_string(),
            });
        }
        self.streams.lock().remove(&listener_id);
        Ok(())
    }
}

/// One call into the block processor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub channel: String,
    pub block: u64,
    pub ok: bool,
}

/// Checkpoint store and block processor backed by maps
pub struct MemoryPersistence {
    heights: Mutex<HashMap<(String, String), u64>>,
    checkpoint_error: AtomicBool,
    failing_blocks: Mutex<HashSet<u64>>,
    panicking_blocks: Mutex<HashSet<u64>>,
    attempts: mpsc::UnboundedSender<Attempt>,
}

impl MemoryPersistence {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Attempt>) {
        let (attempts, receiver) = mpsc::unbounded_channel();
        let persistence = Arc::new(Self {
            heights: Mutex::new(HashMap::new()),
            checkpoint_error: AtomicBool::new(false),
            failing_blocks: Mutex::new(HashSet::new()),
            panicking_blocks: Mutex::new(HashSet::new()),
            attempts,
        });
        (persistence, receiver)
    }

    pub fn set_height(&self, network_id: &str, channel_key: &str, height: u64) {
        self.heights
            .lock()
            .insert((network_id.to_string(), channel_key.to_string()), height);
    }

    pub fn set_checkpoint_error(&self, fail: bool) {
        self.checkpoint_error.store(fail, Ordering::SeqCst);
    }

    pub fn fail_block(&self, block: u64) {
        self.failing_blocks.lock().insert(block);
    }

    pub fn panic_on_block(&self, block: u64) {
        self.panicking_blocks.lock().insert(block);
    }
}

#[async_trait]
impl CheckpointStore for MemoryPersistence {
    async fn current_block_height(
        &self,
        network_id: &str,
        channel_key: &str,
    ) -> Result<Option<u64>, SyncError> {
        if self.checkpoint_error.load(Ordering::SeqCst) {
            return Err(SyncError::Persistence("database unavailable".to_string()));
        }
        Ok(self
            .heights
            .lock()
            .get(&(network_id.to_string(), channel_key.to_string()))
            .copied())
    }
}

#[async_trait]
impl BlockProcessor for MemoryPersistence {
    async fn process_block(&self, context: &ChannelContext, block: &RawBlock) -> Result<(), SyncError> {
        let number = block.number.as_u64();
        if self.panicking_blocks.lock().contains(&number) {
            let _ = self.attempts.send(Attempt {
                channel: context.channel.clone(),
                block: number,
                ok: false,
            });
            panic!("processor crashed on block {}", number);
        }
        let ok = !self.failing_blocks.lock().contains(&number);
        let _ = self.attempts.send(Attempt {
            channel: context.channel.clone(),
            block: number,
            ok,
        });

        if ok {
            Ok(())
        } else {
            Err(SyncError::Processing {
                channel: context.channel.clone(),
                block: number,
                reason: "decoder rejected block".to_string(),
            })
        }
    }
}

pub async fn next_attempt(attempts: &mut mpsc::UnboundedReceiver<Attempt>) -> Attempt {
    tokio::time::timeout(WAIT, attempts.recv())
        .await
        .expect("timed out waiting for the processor")
        .expect("processor channel closed")
}

/// Poll `condition` until it holds or the wait budget runs out
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
