use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{BlockStream, ChannelNetwork, LedgerClient, ListenerId, NetworkProfile};
use crate::models::{BlockNumber, ListenerOptions, RawBlock};
use crate::sync::SyncError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_QUEUE_SIZE: usize = 100;

/// Normalize a gateway URL, adding the websocket scheme when missing
pub fn normalize_gateway_url(input_url: &str) -> Result<Url, SyncError> {
    let mut url_str = input_url.trim().trim_end_matches('/').to_string();

    if !url_str.starts_with("ws://") && !url_str.starts_with("wss://") {
        // Default to secure connection
        url_str = format!("wss://{}", url_str);
        info!("Added missing protocol to gateway URL: {}", url_str);
    }

    Url::parse(&url_str)
        .map_err(|e| SyncError::Config(format!("Invalid gateway URL {}: {}", input_url, e)))
}

/// Websocket endpoint delivering the blocks of one channel starting at `options.start_block`
pub fn block_stream_url(base: &Url, channel: &str, options: &ListenerOptions) -> Result<Url, SyncError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| SyncError::Config(format!("Gateway URL {} cannot carry a path", base)))?
        .pop_if_empty()
        .extend(["channels", channel, "blocks"]);
    url.query_pairs_mut()
        .append_pair("start", &options.start_block.to_string())
        .append_pair("type", options.mode.as_str());
    Ok(url)
}

/// One block as sent by the gateway
#[derive(Debug, Deserialize)]
struct BlockFrame {
    number: BlockNumber,
    data: String,
}

fn decode_frame(text: &str) -> Result<RawBlock, SyncError> {
    let frame: BlockFrame = serde_json::from_str(text)?;
    let payload = hex::decode(frame.data.trim_start_matches("0x"))
        .map_err(|e| SyncError::Other(format!("Invalid block payload encoding: {}", e)))?;

    Ok(RawBlock {
        number: frame.number,
        payload,
    })
}

type ListenerTable = Arc<Mutex<HashMap<ListenerId, CancellationToken>>>;

/// Ledger client backed by a websocket block gateway, one connection per listener
pub struct GatewayClient {
    profile: NetworkProfile,
    gateway_url: Url,
    queue_size: usize,
    listeners: ListenerTable,
    next_listener_id: Arc<AtomicU64>,
}

impl GatewayClient {
    pub fn new(profile: NetworkProfile) -> Result<Self, SyncError> {
        let gateway_url = normalize_gateway_url(&profile.gateway_url)?;
        info!(
            "Gateway client for network {} using {} ({} channels)",
            profile.network_id,
            gateway_url,
            profile.channels.len()
        );

        Ok(Self {
            profile,
            gateway_url,
            queue_size: DEFAULT_QUEUE_SIZE,
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Configure the per-listener delivery queue capacity
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }
}

#[async_trait]
impl LedgerClient for GatewayClient {
    fn network_id(&self) -> &str {
        &self.profile.network_id
    }

    fn channels(&self) -> Vec<String> {
        self.profile.channel_names()
    }

    fn channel_genesis_hash(&self, channel: &str) -> Option<String> {
        self.profile
            .channel(channel)
            .and_then(|c| c.genesis_hash.clone())
    }

    async fn network(&self, channel: &str) -> Result<Arc<dyn ChannelNetwork>, SyncError> {
        if self.profile.channel(channel).is_none() {
            return Err(SyncError::Connectivity {
                channel: channel.to_string(),
                reason: format!("channel is not part of network {}", self.profile.network_id),
            });
        }

        Ok(Arc::new(GatewayNetwork {
            channel: channel.to_string(),
            gateway_url: self.gateway_url.clone(),
            queue_size: self.queue_size,
            listeners: self.listeners.clone(),
            next_listener_id: self.next_listener_id.clone(),
        }))
    }
}

struct GatewayNetwork {
    channel: String,
    gateway_url: Url,
    queue_size: usize,
    listeners: ListenerTable,
    next_listener_id: Arc<AtomicU64>,
}

#[async_trait]
impl ChannelNetwork for GatewayNetwork {
    async fn add_block_listener(&self, options: ListenerOptions) -> Result<BlockStream, SyncError> {
        let url = block_stream_url(&self.gateway_url, &self.channel, &options)?;
        info!("Connecting block listener for [{}] at {}", self.channel, url);

        let subscription_error = |reason: String| SyncError::Subscription {
            channel: self.channel.clone(),
            reason,
        };

        let (ws_stream, response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| subscription_error(format!("connection timed out after {:?}", CONNECT_TIMEOUT)))?
            .map_err(|e| subscription_error(e.to_string()))?;

        debug!("Gateway accepted [{}] with status {}", self.channel, response.status());

        let listener_id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        let cancel = CancellationToken::new();
        self.listeners.lock().insert(listener_id, cancel.clone());

        let (sender, events) = mpsc::channel(self.queue_size);
        let channel = self.channel.clone();
        let listeners = self.listeners.clone();

        tokio::spawn(async move {
            let (mut write, mut read) = ws_stream.split();

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Closing block stream {} for [{}]", listener_id, channel);
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    _ = sender.closed() => {
                        debug!("Block stream {} for [{}] lost its consumer, closing", listener_id, channel);
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    message = read.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                                Ok(block) => {
                                    if sender.send(block).await.is_err() {
                                        debug!("Block stream {} for [{}] has no consumer", listener_id, channel);
                                        break;
                                    }
                                }
                                Err(e) => warn!("Discarding malformed frame on [{}]: {}", channel, e),
                            },
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = write.send(Message::Pong(data)).await {
                                    error!("Failed to send pong on [{}]: {}", channel, e);
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("Gateway closed block stream for [{}]: {:?}", channel, frame);
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!("Block stream error on [{}]: {}", channel, e);
                                break;
                            }
                            None => {
                                info!("Block stream for [{}] ended", channel);
                                break;
                            }
                        }
                    }
                }
            }

            listeners.lock().remove(&listener_id);
        });

        Ok(BlockStream { listener_id, events })
    }

    async fn remove_block_listener(&self, listener_id: ListenerId) -> Result<(), SyncError> {
        match self.listeners.lock().remove(&listener_id) {
            Some(cancel) => {
                cancel.cancel();
                Ok(())
            }
            None => Err(SyncError::ListenerRemoval {
                channel: self.channel.clone(),
                reason: format!("{} is not active", listener_id),
            }),
        }
    }
}
