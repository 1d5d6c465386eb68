//! Speech capture abstraction.
//!
//! Wraps whatever speech recognition capability the platform offers. The
//! capability may be entirely absent; that is reported as a
//! capability-unavailable error event, never a crash.

mod manual;
mod unavailable;

pub use manual::ManualCapture;
pub use unavailable::UnavailableCapture;

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Classified speech capture failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechErrorKind {
    /// No recognition capability on this platform. Non-retryable.
    Unavailable,
    /// Microphone permission denied. Capture stays disabled until the user
    /// retries.
    PermissionDenied,
    /// User-initiated stop. Explicitly not an error condition.
    Aborted,
    /// Anything else; treated as transient.
    Transient,
}

/// Event emitted by a speech capture session.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Started,
    /// Partial transcript; replaces the previous interim text.
    Interim(String),
    /// Committed transcript for the utterance.
    Final(String),
    Error(SpeechErrorKind),
    Ended,
}

/// Capture contract consumed by the coordinator.
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Whether the platform offers recognition at all.
    fn is_available(&self) -> bool;

    async fn start(&self) -> Result<()>;

    /// Stop capture, committing whatever was recognized.
    async fn stop(&self) -> Result<()>;

    /// Abort capture, discarding the utterance. Not an error.
    async fn abort(&self) -> Result<()>;

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SpeechEvent>;
}
