//! Tolk - Accessible Livestream Companion
//!
//! A terminal companion that overlays spoken AI commentary on YouTube videos
//! and livestreams, built for viewers who cannot follow the visuals.
//!
//! The name "Tolk" comes from the Norwegian word for "interpreter."
//!
//! # Overview
//!
//! Tolk allows you to:
//! - Ask spoken or typed questions about what is happening on screen
//! - Hear AI narration with the video volume ducked underneath it
//! - Receive proactively pushed commentary cards and live event updates
//! - Follow livestreams through a real-time transcript feed
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `coordinator` - Interaction state machine and its event loop
//! - `channel` - Realtime channel (WebSocket push + REST questions)
//! - `media` - Media player abstraction
//! - `speech` - Voice capture abstraction
//! - `audio` - Narration playback
//! - `session` - Commentary log and session state
//! - `server` - Companion server (answers, TTS, transcript store)
//! - `answer` - Answer generation
//! - `tts` - Text-to-speech synthesis
//! - `transcript` - Transcript storage and context windows
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tolk::audio::TimedNarrator;
//! use tolk::channel::WsChannel;
//! use tolk::config::Settings;
//! use tolk::coordinator::{CoordinatorConfig, Runtime};
//! use tolk::media::SimulatedPlayer;
//! use tolk::speech::ManualCapture;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let runtime = Runtime::new(
//!         CoordinatorConfig::from_settings(&settings),
//!         Arc::new(SimulatedPlayer::new()),
//!         Arc::new(ManualCapture::new()),
//!         Arc::new(WsChannel::new(&settings.channel)?),
//!         Arc::new(TimedNarrator::new()),
//!     );
//!
//!     let handle = runtime.handle();
//!     handle.load_video("dQw4w9WgXcQ", false);
//!     runtime.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod audio;
pub mod channel;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod media;
pub mod openai;
pub mod server;
pub mod session;
pub mod speech;
pub mod transcript;
pub mod tts;

pub use error::{Result, TolkError};
