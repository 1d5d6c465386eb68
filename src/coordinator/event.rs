//! Event and effect contracts for the interaction coordinator.
//!
//! Every input, from UI commands and player callbacks to speech recognition
//! callbacks, channel messages, and timer expirations, becomes a
//! [`SessionEvent`] on one queue. The reducer consumes them in arrival order
//! and answers with [`Effect`]s for the runtime to apply.

use crate::audio::{AudioPayload, NarrationSource};
use crate::channel::protocol::{InboundEvent, OutboundEvent, QuestionRequest};
use crate::session::{CommentaryItem, EventMetadata};
use crate::speech::SpeechErrorKind;
use std::time::Duration;

/// Coordinator state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No video loaded.
    Idle,
    /// Video loaded, nothing pending.
    Ready,
    /// Question sent, response pending.
    AwaitingAnswer,
    /// AI narration being delivered.
    Narrating,
}

/// One serialized coordinator input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A video was selected; resets the session.
    LoadVideo { video_id: String, is_live: bool },
    /// The user submitted a typed question.
    SubmitText(String),
    /// Speech capture began.
    VoiceStarted,
    /// Partial transcript update.
    VoiceInterim(String),
    /// Final transcript committed for the utterance.
    VoiceFinal(String),
    /// Speech capture ended.
    VoiceEnded,
    /// Speech capture failed.
    VoiceError(SpeechErrorKind),
    /// Player position update, in seconds.
    PlayerTime(f64),
    /// Player switched between playing and paused.
    PlayerStateChanged(bool),
    /// The user explicitly set the volume; becomes the ducking baseline.
    UserSetVolume(u8),
    /// The user toggled mute.
    UserSetMuted(bool),
    /// The auto-pause pulse window elapsed.
    PausePulseElapsed,
    /// The question request resolved.
    AnswerArrived {
        generation: u64,
        answer: String,
        audio: Option<AudioPayload>,
    },
    /// The question request failed.
    QuestionFailed { generation: u64, message: String },
    /// Narration playback finished.
    NarrationEnded { generation: u64 },
    /// Narration playback failed.
    NarrationFailed { generation: u64, message: String },
    /// Push event from the realtime channel.
    Inbound(InboundEvent),
}

/// Side effect requested by the reducer, applied by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Load a video into the media player.
    LoadPlayer(String),
    /// Pause the media player.
    PausePlayer,
    /// Apply a ducked or restored volume.
    SetPlayerVolume(u8),
    /// Fire-and-forget send over the realtime channel.
    SendOutbound(OutboundEvent),
    /// Issue the question request; the response comes back as
    /// [`SessionEvent::AnswerArrived`] or [`SessionEvent::QuestionFailed`]
    /// tagged with the same generation.
    AskQuestion {
        generation: u64,
        request: QuestionRequest,
    },
    /// Start narration playback for a generation.
    PlayNarration {
        generation: u64,
        source: NarrationSource,
    },
    /// Stop any narration still playing.
    StopNarration,
    /// Schedule [`SessionEvent::PausePulseElapsed`] after the delay.
    SchedulePulseRevert(Duration),
}

/// Presentation-facing notification emitted by the runtime after each
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// A commentary item was appended.
    Item(CommentaryItem),
    /// The coordinator state changed.
    State(CoordinatorState),
    /// The remote service started or finished processing.
    Processing(bool),
    /// The interim dictation buffer changed.
    Interim(String),
    /// Event sidebar metadata changed.
    EventMetadata(EventMetadata),
}
