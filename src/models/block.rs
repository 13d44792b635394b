use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height split into two 32-bit words, the way ledger SDKs hand it over
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber {
    pub high: u32,
    pub low: u32,
}

impl BlockNumber {
    pub const GENESIS: BlockNumber = BlockNumber { high: 0, low: 0 };

    pub fn new(high: u32, low: u32) -> Self {
        Self { high, low }
    }

    /// The genesis block arrives through a separate ingestion path and must never be forwarded
    pub fn is_genesis(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    pub fn as_u64(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

impl From<u64> for BlockNumber {
    fn from(number: u64) -> Self {
        Self {
            high: (number >> 32) as u32,
            low: number as u32,
        }
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

/// A block as delivered by a channel subscription
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBlock {
    pub number: BlockNumber,
    pub payload: Vec<u8>,
}

impl RawBlock {
    pub fn new(number: u64, payload: Vec<u8>) -> Self {
        Self {
            number: BlockNumber::from(number),
            payload,
        }
    }
}

/// How much of each block the listener asks the ledger for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerMode {
    #[default]
    Full,
    Filtered,
    Private,
}

impl ListenerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerMode::Full => "full",
            ListenerMode::Filtered => "filtered",
            ListenerMode::Private => "private",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerOptions {
    pub start_block: u64,
    pub mode: ListenerMode,
}

impl ListenerOptions {
    pub fn full_from(start_block: u64) -> Self {
        Self {
            start_block,
            mode: ListenerMode::Full,
        }
    }
}

/// Identifies the network and channel a block belongs to when it is handed to a processor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelContext {
    pub network_id: String,
    pub channel: String,
    pub channel_genesis_hash: Option<String>,
}

impl ChannelContext {
    /// Key under which persistence tracks the channel: its genesis hash when known
    pub fn checkpoint_key(&self) -> &str {
        self.channel_genesis_hash.as_deref().unwrap_or(&self.channel)
    }
}
