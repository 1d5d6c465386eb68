//! Wire types for the realtime channel.
//!
//! Push messages travel as a `{"type": EVENT_NAME, "data": {...}}` envelope;
//! the question request/response pair goes over plain REST. Field names are
//! snake_case to match the companion server.

use crate::session::{Comparison, EventMetadata, Highlight};
use crate::transcript::TranscriptEntry;
use serde::{Deserialize, Serialize};

/// Inbound event kind, used for subscription registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    AudioResponse,
    PauseVideo,
    ProcessingStart,
    ProcessingComplete,
    Error,
    PushCommentary,
    PushEventUpdate,
    TranscriptUpdate,
}

impl InboundKind {
    pub const ALL: [InboundKind; 8] = [
        InboundKind::AudioResponse,
        InboundKind::PauseVideo,
        InboundKind::ProcessingStart,
        InboundKind::ProcessingComplete,
        InboundKind::Error,
        InboundKind::PushCommentary,
        InboundKind::PushEventUpdate,
        InboundKind::TranscriptUpdate,
    ];
}

/// Answer payload delivered over the push channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Server-initiated pause request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PauseRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Error pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub message: String,
}

/// A commentary card pushed proactively by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentaryPush {
    /// Card type string ("analysis", "narration", "player_profile", ...).
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub highlight: Option<Highlight>,
    #[serde(default)]
    pub comparison: Option<Comparison>,
}

/// Live transcript entry pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptUpdate {
    pub entry: TranscriptEntry,
}

/// Empty payload placeholder for processing lifecycle events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

/// Typed inbound push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "AUDIO_RESPONSE")]
    AudioResponse(AudioResponse),
    #[serde(rename = "PAUSE_VIDEO")]
    PauseVideo(PauseRequest),
    #[serde(rename = "PROCESSING_START")]
    ProcessingStart(Empty),
    #[serde(rename = "PROCESSING_COMPLETE")]
    ProcessingComplete(Empty),
    #[serde(rename = "ERROR")]
    Error(RemoteError),
    #[serde(rename = "PUSH_COMMENTARY")]
    PushCommentary(CommentaryPush),
    #[serde(rename = "PUSH_EVENT_UPDATE")]
    PushEventUpdate(EventMetadata),
    #[serde(rename = "TRANSCRIPT_UPDATE")]
    TranscriptUpdate(TranscriptUpdate),
}

impl InboundEvent {
    pub fn kind(&self) -> InboundKind {
        match self {
            InboundEvent::AudioResponse(_) => InboundKind::AudioResponse,
            InboundEvent::PauseVideo(_) => InboundKind::PauseVideo,
            InboundEvent::ProcessingStart(_) => InboundKind::ProcessingStart,
            InboundEvent::ProcessingComplete(_) => InboundKind::ProcessingComplete,
            InboundEvent::Error(_) => InboundKind::Error,
            InboundEvent::PushCommentary(_) => InboundKind::PushCommentary,
            InboundEvent::PushEventUpdate(_) => InboundKind::PushEventUpdate,
            InboundEvent::TranscriptUpdate(_) => InboundKind::TranscriptUpdate,
        }
    }
}

/// Playback position notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackUpdate {
    pub video_id: String,
    pub playback_time: f64,
}

/// Question sent over the push channel (the REST path uses
/// [`QuestionRequest`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionPush {
    pub question: String,
    pub video_id: String,
    pub playback_time: f64,
    #[serde(default)]
    pub is_live: bool,
}

/// Typed outbound event for the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "VOICE_DETECTED")]
    VoiceDetected(Empty),
    #[serde(rename = "PLAYBACK_UPDATE")]
    PlaybackUpdate(PlaybackUpdate),
    #[serde(rename = "QUESTION")]
    Question(QuestionPush),
}

/// Live transcript submission for the transcript socket. Unlike push events,
/// this message is flat (no `data` envelope).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveTranscriptMessage {
    /// Always `"LIVE_TRANSCRIPT"`.
    #[serde(rename = "type")]
    pub message_type: String,
    pub video_id: String,
    pub entry: TranscriptEntry,
}

impl LiveTranscriptMessage {
    pub const TYPE: &'static str = "LIVE_TRANSCRIPT";

    pub fn new(video_id: impl Into<String>, entry: TranscriptEntry) -> Self {
        Self {
            message_type: Self::TYPE.to_string(),
            video_id: video_id.into(),
            entry,
        }
    }
}

/// REST question request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    pub video_id: String,
    /// Current playback position in seconds.
    pub playback_time: f64,
    #[serde(default)]
    pub is_live: bool,
    /// Optional base64-encoded snapshot of the video frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_snapshot: Option<String>,
}

/// REST question response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub answer: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_base64: Option<String>,
    #[serde(default)]
    pub transcript_context: Vec<TranscriptEntry>,
}

/// REST video load request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoLoadRequest {
    pub url: String,
}

/// REST video load response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoLoadResponse {
    pub video_id: String,
    pub title: String,
    pub is_live: bool,
    pub has_captions: bool,
    pub message: String,
}
