use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::checkpoint::CheckpointResolver;
use super::processor::BlockProcessor;
use super::registry::{ListenerHandle, ListenerRegistry, Reservation};
use super::sender::{Sender, SyncMessage};
use super::SyncError;
use crate::ledger::{LedgerClient, ListenerId};
use crate::models::{ChannelContext, ListenerOptions, RawBlock};

/// Result of a successful [`ChannelEventHub::ensure_subscribed`] call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new listener was registered, delivering blocks from `start_block`
    Subscribed { start_block: u64 },
    /// The channel was already subscribed, or another caller is subscribing it right now
    AlreadySubscribed,
}

/// Manages the block subscription of every channel of one network
pub struct ChannelEventHub {
    client: Arc<dyn LedgerClient>,
    resolver: CheckpointResolver,
    processor: Arc<dyn BlockProcessor>,
    sender: Sender,
    registry: Arc<ListenerRegistry>,
}

impl ChannelEventHub {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        resolver: CheckpointResolver,
        processor: Arc<dyn BlockProcessor>,
        sender: Sender,
        registry: Arc<ListenerRegistry>,
    ) -> Self {
        Self {
            client,
            resolver,
            processor,
            sender,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn network_id(&self) -> &str {
        self.client.network_id()
    }

    /// Subscribe `channel` unless it already is. Safe to call repeatedly and concurrently.
    pub async fn ensure_subscribed(&self, channel: &str) -> Result<SubscribeOutcome, SyncError> {
        if self.registry.has(channel) {
            debug!("Channel event hub already exists for [{}]", channel);
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let Some(reservation) = self.registry.reserve(channel) else {
            debug!("Channel event hub for [{}] is already being created", channel);
            return Ok(SubscribeOutcome::AlreadySubscribed);
        };

        match self.open_subscription(reservation).await {
            Ok(start_block) => Ok(SubscribeOutcome::Subscribed { start_block }),
            Err(e) => {
                error!("Failed to add block listener for {}: {}", channel, e);
                Err(e)
            }
        }
    }

    /// Open a listener for the reserved channel. Nothing is registered unless every step succeeds.
    async fn open_subscription(&self, reservation: Reservation) -> Result<u64, SyncError> {
        let channel = reservation.channel().to_string();
        let network = self.client.network(&channel).await?;

        let context = ChannelContext {
            network_id: self.client.network_id().to_string(),
            channel: channel.clone(),
            channel_genesis_hash: self.client.channel_genesis_hash(&channel),
        };
        let start_block = self
            .resolver
            .resolve_resume_height(&context.network_id, context.checkpoint_key())
            .await;

        let stream = network
            .add_block_listener(ListenerOptions::full_from(start_block))
            .await?;

        let handle = ListenerHandle::new(stream.listener_id);
        let cancel = handle.cancel.clone();
        // Commit first so a stream that closes immediately can evict its own entry
        reservation.commit(handle);
        tokio::spawn(consume_blocks(
            context,
            stream.listener_id,
            stream.events,
            cancel,
            self.processor.clone(),
            self.sender.clone(),
            self.registry.clone(),
        ));

        info!(
            "Successfully created channel event hub for [{}] starting at block {}",
            channel, start_block
        );
        Ok(start_block)
    }

    pub fn is_connected(&self, channel: &str) -> bool {
        self.registry.has(channel)
    }

    /// Remove the listener of `channel` from the network and forget it.
    ///
    /// Returns `Ok(false)` when nothing was subscribed. The registry entry is
    /// dropped even when the network refuses the removal or cannot be reached.
    /// In that case cancelling the consumer drops its block queue, and a
    /// [`ChannelNetwork`](crate::ledger::ChannelNetwork) must stop delivering
    /// once its queue has no receiver.
    pub async fn disconnect(&self, channel: &str) -> Result<bool, SyncError> {
        debug!("disconnect({})", channel);
        let Some(handle) = self.registry.get(channel) else {
            debug!("No channel event hub to disconnect for [{}]", channel);
            return Ok(false);
        };

        let removal = match self.client.network(channel).await {
            Ok(network) => network.remove_block_listener(handle.listener_id).await,
            Err(e) => Err(e),
        };

        self.registry.remove_listener(channel, handle.listener_id);
        handle.cancel.cancel();
        self.sender.send(SyncMessage::ChannelDisconnected {
            network_id: self.client.network_id().to_string(),
            channel: channel.to_string(),
        });

        match removal {
            Ok(()) => {
                info!(
                    "Disconnected channel event hub for [{}] (active since {})",
                    channel, handle.registered_at
                );
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Removed [{}] locally but the network listener removal failed: {}",
                    channel, e
                );
                Err(e)
            }
        }
    }

    /// Disconnect every subscribed channel. Returns how many were disconnected
    /// cleanly; failed removals are logged and the channels still forgotten.
    pub async fn disconnect_all(&self) -> usize {
        debug!("disconnect_all()");
        let mut disconnected = 0;

        for channel in self.registry.channels() {
            if !self.is_connected(&channel) {
                debug!("disconnect_all(), no connection found for {}", channel);
                continue;
            }
            match self.disconnect(&channel).await {
                Ok(true) => disconnected += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to disconnect [{}]: {}", channel, e),
            }
        }

        disconnected
    }
}

/// Drains one channel's block queue in delivery order until cancelled or the stream ends
async fn consume_blocks(
    context: ChannelContext,
    listener_id: ListenerId,
    mut events: mpsc::Receiver<RawBlock>,
    cancel: CancellationToken,
    processor: Arc<dyn BlockProcessor>,
    sender: Sender,
    registry: Arc<ListenerRegistry>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Block consumer for [{}] cancelled", context.channel);
                return;
            }
            event = events.recv() => {
                let Some(block) = event else { break };
                forward_block(&context, &block, processor.as_ref(), &sender).await;
            }
        }
    }

    // The ledger closed the stream on its own; free the channel for the next sync pass
    if registry.remove_listener(&context.channel, listener_id) {
        warn!(
            "Block stream for [{}] closed by the network, channel will be resubscribed",
            context.channel
        );
    }
}

/// Hand one delivered block to the processor. Returns whether it was processed.
async fn forward_block(
    context: &ChannelContext,
    block: &RawBlock,
    processor: &dyn BlockProcessor,
    sender: &Sender,
) -> bool {
    // Skip first block, it is processed by the genesis ingestion path
    if block.number.is_genesis() {
        debug!("Skipping genesis block on [{}]", context.channel);
        return false;
    }

    let outcome = AssertUnwindSafe(processor.process_block(context, block))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {
            debug!("Processed block {} on [{}]", block.number, context.channel);
            sender.send(SyncMessage::NewBlock {
                network_id: context.network_id.clone(),
                channel: context.channel.clone(),
                block_number: block.number.as_u64(),
            });
            true
        }
        Ok(Err(e)) => {
            error!(
                "Failed to process block {} on [{}], continuing with the next block: {}",
                block.number, context.channel, e
            );
            false
        }
        Err(panic) => {
            error!(
                "Block processor panicked on block {} of [{}], continuing with the next block: {}",
                block.number,
                context.channel,
                panic_message(&*panic)
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
