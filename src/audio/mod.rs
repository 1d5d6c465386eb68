//! AI narration playback.
//!
//! Narration is the spoken form of an answer. Playback is asynchronous and
//! cancellable: every clip carries the generation of the question that
//! produced it, and completion events from a cancelled generation are
//! discarded upstream so stale audio can never resurface after a new
//! question starts.

use crate::error::{Result, TolkError};
use async_trait::async_trait;
use base64::Engine;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Audio payload attached to an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPayload {
    /// Server-relative URL (`/audio/{id}`).
    Url(String),
    /// Base64-encoded MP3 bytes.
    Base64(String),
}

/// One narration clip: the spoken text plus its audio payload, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationSource {
    pub text: String,
    pub audio: Option<AudioPayload>,
}

/// Completion event for a narration clip.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
    Ended { generation: u64 },
    Failed { generation: u64, message: String },
}

/// Playback contract consumed by the coordinator runtime.
#[async_trait]
pub trait NarrationPlayer: Send + Sync {
    /// Begin playing a clip. Any clip still playing is stopped first.
    async fn play(&self, generation: u64, source: NarrationSource) -> Result<()>;

    /// Stop the current clip without emitting a completion event.
    fn stop(&self);

    fn subscribe(&self) -> mpsc::UnboundedReceiver<NarrationEvent>;
}

/// Speaking pace used to time narration, in words per second.
const WORDS_PER_SECOND: f64 = 2.5;
const MIN_CLIP_SECONDS: f64 = 1.0;
const MAX_CLIP_SECONDS: f64 = 30.0;

/// Headless narration player.
///
/// Terminals have no guaranteed audio device, so playback is paced from the
/// spoken text instead of decoded samples; the base64 payload is still
/// validated so a corrupt clip fails the same way a real decoder would.
pub struct TimedNarrator {
    current: Mutex<Option<tokio::task::JoinHandle<()>>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<NarrationEvent>>>>,
}

impl TimedNarrator {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn emit(subscribers: &Mutex<Vec<mpsc::UnboundedSender<NarrationEvent>>>, event: NarrationEvent) {
        let mut subscribers = subscribers.lock().expect("narrator lock poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn clip_duration(text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1) as f64;
        let seconds = (words / WORDS_PER_SECOND).clamp(MIN_CLIP_SECONDS, MAX_CLIP_SECONDS);
        Duration::from_secs_f64(seconds)
    }
}

impl Default for TimedNarrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NarrationPlayer for TimedNarrator {
    async fn play(&self, generation: u64, source: NarrationSource) -> Result<()> {
        self.stop();

        if let Some(AudioPayload::Base64(encoded)) = &source.audio {
            if let Err(e) = base64::engine::general_purpose::STANDARD.decode(encoded) {
                return Err(TolkError::Narration(format!("invalid audio payload: {}", e)));
            }
        }

        let duration = Self::clip_duration(&source.text);
        debug!(
            "Narrating generation {} for {:.1}s",
            generation,
            duration.as_secs_f64()
        );

        let subscribers = Arc::clone(&self.subscribers);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            Self::emit(&subscribers, NarrationEvent::Ended { generation });
        });

        *self.current.lock().expect("narrator lock poisoned") = Some(handle);
        Ok(())
    }

    fn stop(&self) {
        if let Some(handle) = self.current.lock().expect("narrator lock poisoned").take() {
            handle.abort();
        }
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<NarrationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("narrator lock poisoned")
            .push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clip_ends_after_pacing_delay() {
        let narrator = TimedNarrator::new();
        let mut events = narrator.subscribe();

        narrator
            .play(
                7,
                NarrationSource {
                    text: "a short answer of five words".to_string(),
                    audio: None,
                },
            )
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(events.recv().await, Some(NarrationEvent::Ended { generation: 7 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_suppresses_completion() {
        let narrator = TimedNarrator::new();
        let mut events = narrator.subscribe();

        narrator
            .play(
                1,
                NarrationSource {
                    text: "stale answer".to_string(),
                    audio: None,
                },
            )
            .await
            .unwrap();
        narrator.stop();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_corrupt_base64_fails_immediately() {
        let narrator = TimedNarrator::new();
        let mut events = narrator.subscribe();

        let result = narrator
            .play(
                3,
                NarrationSource {
                    text: "answer".to_string(),
                    audio: Some(AudioPayload::Base64("not!base64!".to_string())),
                },
            )
            .await;

        assert!(matches!(result, Err(TolkError::Narration(_))));
        // No clip started, so no completion event is ever emitted.
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_pacing_bounds() {
        assert_eq!(TimedNarrator::clip_duration("hi"), Duration::from_secs_f64(1.0));
        let long = "word ".repeat(200);
        assert_eq!(
            TimedNarrator::clip_duration(&long),
            Duration::from_secs_f64(30.0)
        );
    }
}
