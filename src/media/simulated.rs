//! Simulated media player.
//!
//! Drives a playback clock without any real video output. Used by the
//! interactive terminal session and by coordinator tests, where time can be
//! advanced deterministically with [`SimulatedPlayer::advance`].

use super::{MediaPlayer, PlayerEvent};
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Default)]
struct PlayerState {
    video_id: Option<String>,
    playing: bool,
    time: f64,
    duration: Option<f64>,
    volume: u8,
    muted: bool,
}

/// Headless player with a simulated clock.
pub struct SimulatedPlayer {
    state: Mutex<PlayerState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PlayerEvent>>>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlayerState {
                volume: 80,
                ..Default::default()
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Start a background clock that advances playback once a second while
    /// the player is playing.
    pub fn start_clock(self: &Arc<Self>) {
        let player = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                player.advance(1.0);
            }
        });
    }

    /// Advance the clock by `seconds` if playing, emitting a time update.
    pub fn advance(&self, seconds: f64) {
        let update = {
            let mut state = self.state.lock().expect("player lock poisoned");
            if !state.playing {
                return;
            }
            state.time += seconds;
            if let Some(duration) = state.duration {
                if state.time >= duration {
                    state.time = duration;
                    state.playing = false;
                }
            }
            state.time
        };
        self.emit(PlayerEvent::TimeUpdated(update));
    }

    /// Current volume, 0-100.
    pub fn volume(&self) -> u8 {
        self.state.lock().expect("player lock poisoned").volume
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().expect("player lock poisoned").muted
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().expect("player lock poisoned").playing
    }

    /// Audible output level: 0 while muted, the set volume otherwise.
    pub fn effective_output(&self) -> u8 {
        let state = self.state.lock().expect("player lock poisoned");
        if state.muted {
            0
        } else {
            state.volume
        }
    }

    fn emit(&self, event: PlayerEvent) {
        let mut subscribers = self.subscribers.lock().expect("player lock poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn set_playing(&self, playing: bool) {
        let changed = {
            let mut state = self.state.lock().expect("player lock poisoned");
            if state.video_id.is_none() || state.playing == playing {
                false
            } else {
                state.playing = playing;
                true
            }
        };
        if changed {
            self.emit(PlayerEvent::StateChanged(playing));
        }
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaPlayer for SimulatedPlayer {
    async fn load(&self, video_id: &str) -> Result<()> {
        if video_id.is_empty() {
            return Err(TolkError::Player("cannot load an empty video id".to_string()));
        }
        {
            let mut state = self.state.lock().expect("player lock poisoned");
            state.video_id = Some(video_id.to_string());
            state.time = 0.0;
            state.playing = false;
            state.duration = None;
        }
        debug!("Loaded video {}", video_id);
        self.emit(PlayerEvent::StateChanged(false));
        self.emit(PlayerEvent::TimeUpdated(0.0));
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.set_playing(true);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.set_playing(false);
        Ok(())
    }

    async fn set_volume(&self, percent: u8) -> Result<()> {
        let mut state = self.state.lock().expect("player lock poisoned");
        state.volume = percent.min(100);
        Ok(())
    }

    async fn mute(&self) -> Result<()> {
        self.state.lock().expect("player lock poisoned").muted = true;
        Ok(())
    }

    async fn unmute(&self) -> Result<()> {
        self.state.lock().expect("player lock poisoned").muted = false;
        Ok(())
    }

    async fn current_time(&self) -> f64 {
        self.state.lock().expect("player lock poisoned").time
    }

    async fn duration(&self) -> Option<f64> {
        self.state.lock().expect("player lock poisoned").duration
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("player lock poisoned")
            .push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_only_advances_while_playing() {
        let player = SimulatedPlayer::new();
        player.load("abc123def45").await.unwrap();

        player.advance(3.0);
        assert_eq!(player.current_time().await, 0.0);

        player.play().await.unwrap();
        player.advance(3.0);
        assert_eq!(player.current_time().await, 3.0);

        player.pause().await.unwrap();
        player.advance(3.0);
        assert_eq!(player.current_time().await, 3.0);
    }

    #[tokio::test]
    async fn test_load_rejects_empty_video_id() {
        let player = SimulatedPlayer::new();
        assert!(matches!(
            player.load("").await,
            Err(TolkError::Player(_))
        ));
    }

    #[tokio::test]
    async fn test_mute_silences_without_losing_volume() {
        let player = SimulatedPlayer::new();
        player.set_volume(55).await.unwrap();
        player.mute().await.unwrap();

        assert_eq!(player.effective_output(), 0);
        assert_eq!(player.volume(), 55);

        player.unmute().await.unwrap();
        assert_eq!(player.effective_output(), 55);
    }

    #[tokio::test]
    async fn test_subscribers_see_time_updates() {
        let player = SimulatedPlayer::new();
        let mut events = player.subscribe();

        player.load("abc123def45").await.unwrap();
        player.play().await.unwrap();
        player.advance(1.0);

        // load emits a state change and a zero time update first
        assert_eq!(events.recv().await, Some(PlayerEvent::StateChanged(false)));
        assert_eq!(events.recv().await, Some(PlayerEvent::TimeUpdated(0.0)));
        assert_eq!(events.recv().await, Some(PlayerEvent::StateChanged(true)));
        assert_eq!(events.recv().await, Some(PlayerEvent::TimeUpdated(1.0)));
    }
}
