use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ledger::ListenerId;

/// Everything needed to tear down one channel subscription
#[derive(Clone, Debug)]
pub struct ListenerHandle {
    pub listener_id: ListenerId,
    pub registered_at: DateTime<Utc>,
    /// Stops the channel's consumer task once the block in hand is finished
    pub cancel: CancellationToken,
}

impl ListenerHandle {
    pub fn new(listener_id: ListenerId) -> Self {
        Self {
            listener_id,
            registered_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }
}

#[derive(Debug)]
enum Slot {
    /// A subscription is being opened for this channel
    Reserved,
    Active(ListenerHandle),
}

/// Channel name to live subscription. Holds at most one entry per channel.
///
/// The lock is never held across an await: callers reserve a channel, do their
/// async setup, then commit the handle through the [`Reservation`].
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    entries: Mutex<HashMap<String, Slot>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True only for channels with a committed subscription
    pub fn has(&self, channel: &str) -> bool {
        matches!(self.entries.lock().get(channel), Some(Slot::Active(_)))
    }

    pub fn get(&self, channel: &str) -> Option<ListenerHandle> {
        match self.entries.lock().get(channel) {
            Some(Slot::Active(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Unconditional insert, last write wins
    pub fn put(&self, channel: &str, handle: ListenerHandle) {
        self.entries
            .lock()
            .insert(channel.to_string(), Slot::Active(handle));
    }

    /// Claim `channel` for a new subscription. Returns `None` when the channel is
    /// already active or another caller holds the claim.
    pub fn reserve(self: &Arc<Self>, channel: &str) -> Option<Reservation> {
        let mut entries = self.entries.lock();
        if entries.contains_key(channel) {
            return None;
        }
        entries.insert(channel.to_string(), Slot::Reserved);

        Some(Reservation {
            registry: Arc::clone(self),
            channel: channel.to_string(),
            committed: false,
        })
    }

    pub fn remove(&self, channel: &str) -> Option<ListenerHandle> {
        let mut entries = self.entries.lock();
        match entries.get(channel) {
            Some(Slot::Active(_)) => match entries.remove(channel) {
                Some(Slot::Active(handle)) => Some(handle),
                _ => None,
            },
            _ => None,
        }
    }

    /// Remove the entry for `channel` only if it still belongs to `listener_id`
    pub fn remove_listener(&self, channel: &str, listener_id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let matches = matches!(
            entries.get(channel),
            Some(Slot::Active(handle)) if handle.listener_id == listener_id
        );
        if matches {
            entries.remove(channel);
        }
        matches
    }

    pub fn for_each(&self, mut f: impl FnMut(&str, &ListenerHandle)) {
        for (channel, slot) in self.entries.lock().iter() {
            if let Slot::Active(handle) = slot {
                f(channel, handle);
            }
        }
    }

    /// Snapshot of the active channel names, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut channels = Vec::new();
        self.for_each(|channel, _| channels.push(channel.to_string()));
        channels.sort();
        channels
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive claim on a channel while its subscription is opened.
/// Dropping it without committing releases the claim.
#[derive(Debug)]
pub struct Reservation {
    registry: Arc<ListenerRegistry>,
    channel: String,
    committed: bool,
}

impl Reservation {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn commit(mut self, handle: ListenerHandle) {
        self.registry.put(&self.channel, handle);
        self.committed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut entries = self.registry.entries.lock();
        if matches!(entries.get(&self.channel), Some(Slot::Reserved)) {
            entries.remove(&self.channel);
            debug!("Released reservation for [{}]", self.channel);
        }
    }
}
