//! Configuration settings for Tolk.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub playback: PlaybackSettings,
    pub voice: VoiceSettings,
    pub commentary: CommentarySettings,
    pub channel: ChannelSettings,
    pub answer: AnswerSettings,
    pub tts: TtsSettings,
    pub transcript: TranscriptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tolk".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Playback and volume ducking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Starting media volume (0-100).
    pub default_volume: u8,
    /// Media volume while the user is speaking or AI narration plays (0-100).
    pub ducking_percent: u8,
    /// Interval in whole seconds between playback position updates sent
    /// over the realtime channel.
    pub update_interval_seconds: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_volume: 80,
            ducking_percent: 20,
            update_interval_seconds: 5,
        }
    }
}

/// Voice capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Submit the final transcript as a question automatically when capture ends.
    pub auto_submit: bool,
    /// Duration of the auto-pause pulse fired when capture starts, in milliseconds.
    pub pause_pulse_ms: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            auto_submit: true,
            pause_pulse_ms: 1500,
        }
    }
}

/// Commentary log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentarySettings {
    /// Maximum number of items kept in the commentary log.
    pub max_log_size: usize,
    /// Show timestamps next to commentary items.
    pub show_timestamps: bool,
}

impl Default for CommentarySettings {
    fn default() -> Self {
        Self {
            max_log_size: 50,
            show_timestamps: true,
        }
    }
}

/// Realtime channel endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Base URL of the companion server REST API.
    pub api_base_url: String,
    /// URL of the push WebSocket endpoint.
    pub events_ws_url: String,
    /// Timeout for the question request, in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            events_ws_url: "ws://localhost:8000/ws/events".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

/// Answer generation settings (server side).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    /// Chat model used to answer viewer questions.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
        }
    }
}

/// Text-to-speech settings (server side).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// ElevenLabs voice id. Default is "Rachel", a clear, friendly voice.
    pub voice_id: String,
    /// ElevenLabs model id.
    pub model_id: String,
    /// Environment variable holding the ElevenLabs API key.
    pub api_key_env: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_turbo_v2_5".to_string(),
            api_key_env: "ELEVENLABS_API_KEY".to_string(),
        }
    }
}

/// Transcript context settings (server side).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Seconds of transcript context handed to the answer engine.
    pub window_seconds: f64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            window_seconds: 30.0,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TolkError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tolk")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.playback.ducking_percent, 20);
        assert_eq!(settings.playback.update_interval_seconds, 5);
        assert_eq!(settings.commentary.max_log_size, 50);
        assert!(settings.voice.auto_submit);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [playback]
            ducking_percent = 35
        "#,
        )
        .unwrap();
        assert_eq!(settings.playback.ducking_percent, 35);
        assert_eq!(settings.playback.default_volume, 80);
        assert_eq!(settings.commentary.max_log_size, 50);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.commentary.max_log_size = 10;
        settings.channel.api_base_url = "http://example.test:9000".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.commentary.max_log_size, 10);
        assert_eq!(loaded.channel.api_base_url, "http://example.test:9000");
    }
}
