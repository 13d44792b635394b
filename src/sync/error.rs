use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Connectivity error for channel {channel}: {reason}")]
    Connectivity { channel: String, reason: String },

    #[error("Failed to add block listener for channel {channel}: {reason}")]
    Subscription { channel: String, reason: String },

    #[error("Failed to remove block listener for channel {channel}: {reason}")]
    ListenerRemoval { channel: String, reason: String },

    #[error("Failed to process block {block} on channel {channel}: {reason}")]
    Processing {
        channel: String,
        block: u64,
        reason: String,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported sync platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Sync platform has not been initialized")]
    NotInitialized,

    #[error("Unexpected error: {0}")]
    Other(String),
}

impl SyncError {
    /// Connectivity and subscription failures leave the channel eligible for a later retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connectivity { .. } | Self::Subscription { .. }
        )
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(format!("{:#}", e))
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
