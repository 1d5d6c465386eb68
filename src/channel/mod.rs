//! Realtime channel to the companion server.
//!
//! The channel is a hybrid: push events arrive over a persistent WebSocket,
//! while the question request/response pair goes over REST. The coordinator
//! only sees the [`RealtimeChannel`] trait, so tests substitute an in-memory
//! channel.

pub mod protocol;
mod ws;

pub use protocol::{
    AudioResponse, CommentaryPush, Empty, InboundEvent, InboundKind, LiveTranscriptMessage,
    OutboundEvent, PauseRequest, PlaybackUpdate, QuestionPush, QuestionRequest, QuestionResponse,
    RemoteError, TranscriptUpdate, VideoLoadRequest, VideoLoadResponse,
};
pub use ws::WsChannel;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Callback invoked for a subscribed inbound event kind.
pub type Handler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

/// Opaque handle returned by [`RealtimeChannel::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Bidirectional channel to the remote AI service.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Open the push connection. Calling while already connected is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Close the push connection. Calling while already disconnected is a
    /// no-op.
    async fn disconnect(&self) -> Result<()>;

    /// Fire-and-forget send over the push connection.
    async fn send(&self, event: OutboundEvent) -> Result<()>;

    /// Request/response question call. May run over a separate transport from
    /// the push connection.
    async fn ask_question(&self, request: QuestionRequest) -> Result<QuestionResponse>;

    /// Register a handler for a named inbound event kind.
    fn on(&self, kind: InboundKind, handler: Handler) -> HandlerId;

    /// Remove a previously registered handler.
    fn off(&self, kind: InboundKind, id: HandlerId);
}

/// Per-kind handler registry shared by channel implementations.
#[derive(Default)]
pub struct Subscriptions {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<InboundKind, Vec<(HandlerId, Handler)>>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: InboundKind, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .expect("subscription lock poisoned")
            .entry(kind)
            .or_default()
            .push((id, handler));
        id
    }

    pub fn off(&self, kind: InboundKind, id: HandlerId) {
        if let Some(list) = self
            .handlers
            .lock()
            .expect("subscription lock poisoned")
            .get_mut(&kind)
        {
            list.retain(|(registered, _)| *registered != id);
        }
    }

    /// Invoke every handler registered for the event's kind. Handlers are
    /// cloned out of the lock before the calls so a handler may re-enter the
    /// registry.
    pub fn dispatch(&self, event: &InboundEvent) {
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .expect("subscription lock poisoned")
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in handlers {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::protocol::RemoteError;
    use std::sync::atomic::AtomicUsize;

    fn error_event(message: &str) -> InboundEvent {
        InboundEvent::Error(RemoteError {
            message: message.to_string(),
        })
    }

    #[test]
    fn test_dispatch_reaches_registered_handler() {
        let subs = Subscriptions::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        subs.on(
            InboundKind::Error,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        subs.dispatch(&error_event("rate limited"));
        subs.dispatch(&InboundEvent::ProcessingStart(Empty {}));

        // Only the error event matches the subscription.
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_only_that_handler() {
        let subs = Subscriptions::new();
        let first_hits = Arc::new(AtomicUsize::new(0));
        let second_hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first_hits);
        let first = subs.on(
            InboundKind::Error,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let counter = Arc::clone(&second_hits);
        subs.on(
            InboundKind::Error,
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        subs.off(InboundKind::Error, first);
        subs.dispatch(&error_event("boom"));

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }
}
