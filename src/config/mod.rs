//! Configuration module for Tolk.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AnswerSettings, ChannelSettings, CommentarySettings, GeneralSettings, PlaybackSettings,
    Settings, TranscriptSettings, TtsSettings, VoiceSettings,
};
