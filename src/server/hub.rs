//! Broadcast hub for push events.
//!
//! Every connected events socket gets a copy of each broadcast. Direct
//! replies (processing lifecycle, answers) go to the requesting socket only
//! and bypass the hub.

use crate::channel::protocol::InboundEvent;
use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out of serialized push envelopes to all connected clients.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<String>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Serialize and broadcast a push event. A hub with no subscribers drops
    /// the event silently.
    pub fn broadcast(&self, event: &InboundEvent) {
        match serde_json::to_string(event) {
            Ok(text) => {
                let _ = self.tx.send(text);
            }
            Err(e) => warn!("Failed to serialize push event: {}", e),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::protocol::{PauseRequest, RemoteError};

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = EventHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.broadcast(&InboundEvent::PauseVideo(PauseRequest {
            reason: Some("voice_input".to_string()),
        }));

        let text = a.recv().await.unwrap();
        assert!(text.contains("PAUSE_VIDEO"));
        assert!(text.contains("voice_input"));
        assert_eq!(b.recv().await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_receiving() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();

        // Overrun the channel capacity while the subscriber is not reading.
        for _ in 0..70 {
            hub.broadcast(&InboundEvent::PauseVideo(PauseRequest {
                reason: Some("voice_input".to_string()),
            }));
        }

        // The overrun surfaces once as Lagged; the receiver then resumes
        // from the oldest retained push instead of going dead.
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(rx.recv().await.unwrap().contains("PAUSE_VIDEO"));
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_silent() {
        let hub = EventHub::new();
        hub.broadcast(&InboundEvent::Error(RemoteError {
            message: "nobody listening".to_string(),
        }));
        assert_eq!(hub.connection_count(), 0);
    }
}
