mod block;

pub use block::{BlockNumber, ChannelContext, ListenerMode, ListenerOptions, RawBlock};
