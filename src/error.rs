//! Error types for Tolk.

use thiserror::Error;

/// Library-level error type for Tolk operations.
#[derive(Error, Debug)]
pub enum TolkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid video reference: {0}")]
    InvalidVideo(String),

    #[error("Media player error: {0}")]
    Player(String),

    #[error("Speech capture is not available on this platform")]
    SpeechUnavailable,

    #[error("Speech capture error: {0}")]
    Speech(String),

    #[error("Realtime channel error: {0}")]
    Channel(String),

    #[error("Question request failed: {0}")]
    Question(String),

    #[error("Malformed response from server: {0}")]
    MalformedResponse(String),

    #[error("Answer generation failed: {0}")]
    Answer(String),

    #[error("Text-to-speech failed: {0}")]
    Tts(String),

    #[error("Narration playback error: {0}")]
    Narration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Result type alias for Tolk operations.
pub type Result<T> = std::result::Result<T, TolkError>;
