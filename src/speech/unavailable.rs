//! Capture stub for platforms without speech recognition.

use super::{SpeechCapture, SpeechErrorKind, SpeechEvent};
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Always-absent capability. `start` reports capability-unavailable to the
/// caller and through the event stream; the session continues text-only.
pub struct UnavailableCapture {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SpeechEvent>>>,
}

impl UnavailableCapture {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn emit(&self, event: SpeechEvent) {
        let mut subscribers = self.subscribers.lock().expect("capture lock poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for UnavailableCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechCapture for UnavailableCapture {
    fn is_available(&self) -> bool {
        false
    }

    async fn start(&self) -> Result<()> {
        self.emit(SpeechEvent::Error(SpeechErrorKind::Unavailable));
        Err(TolkError::SpeechUnavailable)
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }

    async fn abort(&self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SpeechEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("capture lock poisoned")
            .push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_reports_unavailable_on_both_paths() {
        let capture = UnavailableCapture::new();
        let mut events = capture.subscribe();

        assert!(matches!(
            capture.start().await,
            Err(TolkError::SpeechUnavailable)
        ));
        assert_eq!(
            events.recv().await,
            Some(SpeechEvent::Error(SpeechErrorKind::Unavailable))
        );
    }
}
