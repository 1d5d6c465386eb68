//! Dictation-style capture fed from the caller.
//!
//! The terminal session has no microphone loop; the user "speaks" by typing
//! dictation commands, and tests script utterances the same way. The emitted
//! event sequence matches a real recognizer: started, interim updates, a
//! final transcript, ended.

use super::{SpeechCapture, SpeechErrorKind, SpeechEvent};
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Capture implementation driven by explicit `dictate_*` calls.
pub struct ManualCapture {
    active: Mutex<bool>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SpeechEvent>>>,
}

impl ManualCapture {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(false),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Feed a partial transcript into the active capture session.
    pub fn dictate_interim(&self, text: &str) {
        if *self.active.lock().expect("capture lock poisoned") {
            self.emit(SpeechEvent::Interim(text.to_string()));
        }
    }

    /// Feed the final transcript and end the capture session.
    pub fn dictate_final(&self, text: &str) {
        let mut active = self.active.lock().expect("capture lock poisoned");
        if !*active {
            return;
        }
        *active = false;
        drop(active);
        self.emit(SpeechEvent::Final(text.to_string()));
        self.emit(SpeechEvent::Ended);
    }

    /// Simulate a recognizer failure.
    pub fn fail(&self, kind: SpeechErrorKind) {
        let mut active = self.active.lock().expect("capture lock poisoned");
        if !*active {
            return;
        }
        *active = false;
        drop(active);
        self.emit(SpeechEvent::Error(kind));
        self.emit(SpeechEvent::Ended);
    }

    fn emit(&self, event: SpeechEvent) {
        let mut subscribers = self.subscribers.lock().expect("capture lock poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for ManualCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechCapture for ManualCapture {
    fn is_available(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<()> {
        let mut active = self.active.lock().expect("capture lock poisoned");
        if *active {
            return Err(TolkError::Speech("capture already active".to_string()));
        }
        *active = true;
        drop(active);
        self.emit(SpeechEvent::Started);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut active = self.active.lock().expect("capture lock poisoned");
        if *active {
            *active = false;
            drop(active);
            self.emit(SpeechEvent::Ended);
        }
        Ok(())
    }

    async fn abort(&self) -> Result<()> {
        let mut active = self.active.lock().expect("capture lock poisoned");
        if *active {
            *active = false;
            drop(active);
            self.emit(SpeechEvent::Error(SpeechErrorKind::Aborted));
            self.emit(SpeechEvent::Ended);
        }
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
    async fn test_utterance_event_sequence() {
        let capture = ManualCapture::new();
        let mut events = capture.subscribe();

        capture.start().await.unwrap();
        capture.dictate_interim("who is");
        capture.dictate_final("who is playing");

        assert_eq!(events.recv().await, Some(SpeechEvent::Started));
        assert_eq!(events.recv().await, Some(SpeechEvent::Interim("who is".to_string())));
        assert_eq!(events.recv().await, Some(SpeechEvent::Final("who is playing".to_string())));
        assert_eq!(events.recv().await, Some(SpeechEvent::Ended));
    }

    #[tokio::test]
    async fn test_dictation_ignored_when_not_started() {
        let capture = ManualCapture::new();
        let mut events = capture.subscribe();

        capture.dictate_final("stray text");
        capture.start().await.unwrap();

        assert_eq!(events.recv().await, Some(SpeechEvent::Started));
    }

    #[tokio::test]
    async fn test_abort_reports_aborted_not_failure() {
        let capture = ManualCapture::new();
        let mut events = capture.subscribe();

        capture.start().await.unwrap();
        capture.abort().await.unwrap();

        assert_eq!(events.recv().await, Some(SpeechEvent::Started));
        assert_eq!(
            events.recv().await,
            Some(SpeechEvent::Error(SpeechErrorKind::Aborted))
        );
        assert_eq!(events.recv().await, Some(SpeechEvent::Ended));
    }
}
