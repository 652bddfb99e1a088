use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

use crate::broadcaster::EventBroadcaster;
use crate::error::Result;
use crate::events::BroadcastEvent;

/// Client connection wrapper
pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Client {
    pub fn new(stream: UnixStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self { reader, writer }
    }

    /// Send event to client
    pub async fn send_event(&mut self, event: &BroadcastEvent) -> Result<()> {
        let json_line = event.to_json_line()?;
        self.writer.write_all(json_line.as_bytes()).await?;
        Ok(())
    }

    /// Stream the broadcaster's events to this client until it goes away
    ///
    /// The subscription lives exactly as long as the connection: it is
    /// registered before the catch-up state is sent and explicitly removed
    /// on disconnect, write failure or server shutdown.
    pub async fn serve(mut self, broadcaster: Arc<EventBroadcaster>, shutdown: CancellationToken) {
        let mut subscription = broadcaster.subscribe();
        let id = subscription.id();

        let catch_up = BroadcastEvent::state_change(broadcaster.current_state());
        if let Err(e) = self.send_event(&catch_up).await {
            tracing::warn!("Failed to send catch-up to subscriber {}: {}", id, e);
            broadcaster.unsubscribe(subscription);
            return;
        }

        // Inbound bytes are ignored; reads only detect the peer hanging up
        let mut scratch = [0u8; 256];

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = subscription.recv() => {
                    let Some(event) = event else { break };
                    if let Err(e) = self.send_event(&event).await {
                        tracing::debug!("Subscriber {} write failed: {}", id, e);
                        break;
                    }
                }
                read = self.reader.read(&mut scratch) => {
                    match read {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            }
        }

        tracing::info!("Subscriber {} disconnected", id);
        broadcaster.unsubscribe(subscription);
    }
}
