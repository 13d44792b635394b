use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use super::checkpoint::CheckpointStore;
use super::platform::SyncPlatform;
use super::processor::BlockProcessor;
use super::sender::Sender;
use super::SyncError;

/// Ledger platforms this crate can synchronize
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformKind {
    Fabric,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Fabric => "fabric",
        }
    }
}

impl FromStr for PlatformKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fabric" => Ok(PlatformKind::Fabric),
            _ => Err(SyncError::UnsupportedPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SyncBuilder;

impl SyncBuilder {
    /// Select the sync implementation for `platform`.
    ///
    /// `persistence` serves both as checkpoint source and as block processor.
    pub fn build<P>(platform: &str, persistence: Arc<P>, sender: Sender) -> Result<SyncPlatform, SyncError>
    where
        P: CheckpointStore + BlockProcessor + 'static,
    {
        let kind: PlatformKind = platform.parse()?;
        info!("Building sync platform {}", kind);

        match kind {
            PlatformKind::Fabric => Ok(SyncPlatform::new(
                kind,
                persistence.clone(),
                persistence,
                sender,
            )),
        }
    }
}
