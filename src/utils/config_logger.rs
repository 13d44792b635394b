use tracing::info;

use crate::config::Config;
use crate::ledger::NetworkProfile;

pub fn log_config(config: &Config, profile: &NetworkProfile) {
    // Database URL is left out, it carries credentials
    info!(
        "Config settings: platform={}, network_profile={}, sync_interval_secs={}, block_queue_size={}, db_max_connections={}, ipc_enabled={}",
        config.platform,
        config.network_profile,
        config.sync_interval_secs,
        config.block_queue_size,
        config.db_max_connections,
        config.ipc_enabled
    );

    info!(
        "Network {} via {} with channels: {}",
        profile.network_id,
        profile.gateway_url,
        profile.channel_names().join(", ")
    );
}
