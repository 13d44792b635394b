use serde::Deserialize;
use tracing::info;

use crate::sync::SyncError;

/// Static description of the ledger network the sync process attaches to
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NetworkProfile {
    pub network_id: String,
    pub gateway_url: String,
    #[serde(default)]
    pub channels: Vec<ChannelProfile>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ChannelProfile {
    pub name: String,
    #[serde(default)]
    pub genesis_hash: Option<String>,
}

impl NetworkProfile {
    /// Load a profile file (format picked from its extension), with `PROFILE__*`
    /// environment variables overriding scalar fields
    pub fn load(path: &str) -> Result<Self, SyncError> {
        info!("Loading network profile from {}", path);

        let profile: NetworkProfile = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("PROFILE").separator("__"))
            .build()?
            .try_deserialize()?;

        profile.validate()?;
        Ok(profile)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, SyncError> {
        let profile: NetworkProfile = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<(), SyncError> {
        if self.network_id.trim().is_empty() {
            return Err(SyncError::Config("network_id must not be empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(SyncError::Config(format!(
                    "channel {} is listed more than once",
                    channel.name
                )));
            }
        }
        Ok(())
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelProfile> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }
}
