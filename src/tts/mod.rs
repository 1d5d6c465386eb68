//! Text-to-speech synthesis.
//!
//! Generated clips are held in an in-memory cache keyed by a fresh id and
//! served from `/audio/{id}`. Without an API key the engine is disabled and
//! answers stay text-only, which the client handles gracefully.

use crate::config::TtsSettings;
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use base64::Engine as _;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Converts answer text to speech and serves the generated audio.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesize `text`, returning an audio id, or `None` when synthesis is
    /// unavailable or failed (never an error: answers degrade to text-only).
    async fn synthesize(&self, text: &str) -> Option<String>;

    /// MP3 bytes for a previously synthesized clip.
    fn audio(&self, audio_id: &str) -> Option<Vec<u8>>;

    /// Base64 form for delivery over the push channel.
    fn audio_base64(&self, audio_id: &str) -> Option<String> {
        self.audio(audio_id)
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// ElevenLabs-backed engine with an in-memory clip cache.
pub struct ElevenLabsTts {
    client: reqwest::Client,
    api_key: Option<String>,
    voice_id: String,
    model_id: String,
    cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl ElevenLabsTts {
    pub fn new(settings: &TtsSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            info!(
                "{} not set; text-to-speech is disabled",
                settings.api_key_env
            );
        }

        let client = reqwest::Client::builder()
            .timeout(SYNTHESIS_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key,
            voice_id: settings.voice_id.clone(),
            model_id: settings.model_id.clone(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn request_speech(&self, text: &str, api_key: &str) -> Result<Vec<u8>> {
        let url = format!("{}/text-to-speech/{}", ELEVENLABS_BASE_URL, self.voice_id);
        let payload = json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
            }
        });

        let response = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TolkError::Tts(format!(
                "ElevenLabs returned {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl TtsEngine for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Option<String> {
        let api_key = self.api_key.as_deref()?;

        match self.request_speech(text, api_key).await {
            Ok(bytes) => {
                let audio_id = Uuid::new_v4().to_string();
                debug!("Synthesized {} bytes as {}", bytes.len(), audio_id);
                self.cache
                    .lock()
                    .unwrap()
                    .insert(audio_id.clone(), bytes);
                Some(audio_id)
            }
            Err(e) => {
                warn!("Text-to-speech failed: {}", e);
                None
            }
        }
    }

    fn audio(&self, audio_id: &str) -> Option<Vec<u8>> {
        self.cache
            .lock()
            .unwrap()
            .get(audio_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine stub that "synthesizes" the input bytes.
    struct CannedTts {
        clips: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl CannedTts {
        fn new() -> Self {
            Self {
                clips: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl TtsEngine for CannedTts {
        async fn synthesize(&self, text: &str) -> Option<String> {
            let audio_id = format!("clip-{}", text.len());
            self.clips
                .lock()
                .unwrap()
                .insert(audio_id.clone(), text.as_bytes().to_vec());
            Some(audio_id)
        }

        fn audio(&self, audio_id: &str) -> Option<Vec<u8>> {
            self.clips.lock().unwrap().get(audio_id).cloned()
        }
    }

    #[tokio::test]
    async fn test_base64_round_trip() {
        let tts = CannedTts::new();
        let id = tts.synthesize("hello").await.unwrap();

        let encoded = tts.audio_base64(&id).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(decoded, b"hello");
    }

    #[tokio::test]
    async fn test_disabled_engine_returns_none() {
        let settings = TtsSettings {
            api_key_env: "TOLK_TEST_MISSING_KEY".to_string(),
            ..Default::default()
        };
        let tts = ElevenLabsTts::new(&settings).unwrap();
        assert!(tts.synthesize("anything").await.is_none());
    }
}
