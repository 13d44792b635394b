mod builder;
mod checkpoint;
mod error;
mod event_hub;
mod orchestrator;
mod platform;
mod processor;
mod registry;
mod sender;

pub use builder::{PlatformKind, SyncBuilder};
pub use checkpoint::{resume_height, CheckpointResolver, CheckpointStore};
pub use error::SyncError;
pub use event_hub::{ChannelEventHub, SubscribeOutcome};
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use platform::SyncPlatform;
pub use processor::BlockProcessor;
pub use registry::{ListenerHandle, ListenerRegistry, Reservation};
pub use sender::{Sender, SyncMessage};
