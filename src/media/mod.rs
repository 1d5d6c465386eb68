//! Media player abstraction.
//!
//! The coordinator never touches a concrete player. Everything goes through
//! the [`MediaPlayer`] trait so the playback technology can be swapped
//! without changing coordinator logic.

mod simulated;

pub use simulated::SimulatedPlayer;

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Event emitted by a media player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playing state flipped (true = playing).
    StateChanged(bool),
    /// Playback position advanced, in seconds.
    TimeUpdated(f64),
}

/// Playback contract consumed by the coordinator.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Load a video and reset the playback position.
    async fn load(&self, video_id: &str) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Set the output volume, 0-100. Does not change the mute state.
    async fn set_volume(&self, percent: u8) -> Result<()>;

    /// Mute the output. Volume is retained and re-applied on unmute.
    async fn mute(&self) -> Result<()>;

    async fn unmute(&self) -> Result<()>;

    async fn current_time(&self) -> f64;

    /// Total duration in seconds, if known (livestreams have none).
    async fn duration(&self) -> Option<f64>;

    /// Subscribe to state-change and time-update events.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent>;
}
