use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Notifications for a supervising process
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "message", rename_all = "kebab-case")]
pub enum SyncMessage {
    SyncStarted {
        network_id: String,
        channels: usize,
    },
    NewBlock {
        network_id: String,
        channel: String,
        block_number: u64,
    },
    ChannelDisconnected {
        network_id: String,
        channel: String,
    },
}

/// Fire-and-forget channel to a parent process. Without one attached every send is a no-op.
#[derive(Clone, Debug, Default)]
pub struct Sender {
    outbound: Option<mpsc::UnboundedSender<SyncMessage>>,
}

impl Sender {
    pub fn detached() -> Self {
        Self { outbound: None }
    }

    /// Deliver messages to whoever holds the receiving end
    pub fn from_channel(outbound: mpsc::UnboundedSender<SyncMessage>) -> Self {
        Self {
            outbound: Some(outbound),
        }
    }

    /// Talk to the parent over stdio: JSON lines out on stdout, inbound lines on
    /// stdin are logged. Must be called inside a tokio runtime.
    pub fn stdio() -> Self {
        let (outbound, mut receiver) = mpsc::unbounded_channel::<SyncMessage>();

        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(message) = receiver.recv().await {
                let mut line = match serde_json::to_string(&message) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to encode message for parent: {}", e);
                        continue;
                    }
                };
                line.push('\n');
                if let Err(e) = stdout.write_all(line.as_bytes()).await {
                    warn!("Parent process channel closed: {}", e);
                    break;
                }
                let _ = stdout.flush().await;
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("Message from parent: {}", line);
            }
        });

        Self::from_channel(outbound)
    }

    pub fn is_attached(&self) -> bool {
        self.outbound.is_some()
    }

    pub fn send(&self, message: SyncMessage) {
        if let Some(outbound) = &self.outbound {
            if outbound.send(message).is_err() {
                debug!("Dropping message, parent process channel is closed");
            }
        }
    }
}
