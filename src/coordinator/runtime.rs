//! Event loop driving the coordinator against its collaborators.
//!
//! All inbound events (player callbacks, speech events, channel pushes,
//! timer expirations, resolved requests) are funneled into one mpsc queue
//! and consumed by a single loop, so coordinator transitions are serialized
//! in arrival order. The loop never blocks: request and narration work is
//! spawned, and resolutions come back through the same queue.

use super::{Coordinator, CoordinatorConfig, CoordinatorState, Effect, SessionEvent, UiUpdate};
use crate::audio::{AudioPayload, NarrationEvent, NarrationPlayer};
use crate::channel::protocol::InboundKind;
use crate::channel::RealtimeChannel;
use crate::error::Result;
use crate::media::{MediaPlayer, PlayerEvent};
use crate::speech::{SpeechCapture, SpeechEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Control surface handed to the presentation layer.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    player: Arc<dyn MediaPlayer>,
    capture: Arc<dyn SpeechCapture>,
}

impl CoordinatorHandle {
    pub fn load_video(&self, video_id: &str, is_live: bool) {
        let _ = self.events.send(SessionEvent::LoadVideo {
            video_id: video_id.to_string(),
            is_live,
        });
    }

    pub fn submit_text(&self, text: &str) {
        let _ = self.events.send(SessionEvent::SubmitText(text.to_string()));
    }

    /// Record an explicit user volume; the ducking policy applies it.
    pub fn set_volume(&self, percent: u8) {
        let _ = self.events.send(SessionEvent::UserSetVolume(percent));
    }

    pub async fn play(&self) -> Result<()> {
        self.player.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        self.player.pause().await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        if muted {
            self.player.mute().await?;
        } else {
            self.player.unmute().await?;
        }
        let _ = self.events.send(SessionEvent::UserSetMuted(muted));
        Ok(())
    }

    pub fn voice_available(&self) -> bool {
        self.capture.is_available()
    }

    pub async fn start_voice(&self) -> Result<()> {
        self.capture.start().await
    }

    pub async fn stop_voice(&self) -> Result<()> {
        self.capture.stop().await
    }

    pub async fn abort_voice(&self) -> Result<()> {
        self.capture.abort().await
    }
}

/// The coordinator event loop.
pub struct Runtime {
    coordinator: Coordinator,
    player: Arc<dyn MediaPlayer>,
    capture: Arc<dyn SpeechCapture>,
    channel: Arc<dyn RealtimeChannel>,
    narrator: Arc<dyn NarrationPlayer>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    ui_tx: Option<mpsc::UnboundedSender<UiUpdate>>,
}

impl Runtime {
    /// Build the runtime and subscribe to the collaborator event streams.
    /// Subscriptions happen here, not in [`run`](Self::run), so events emitted
    /// before the loop task is first polled are queued rather than dropped.
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: CoordinatorConfig,
        player: Arc<dyn MediaPlayer>,
        capture: Arc<dyn SpeechCapture>,
        channel: Arc<dyn RealtimeChannel>,
        narrator: Arc<dyn NarrationPlayer>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let runtime = Self {
            coordinator: Coordinator::new(config),
            player,
            capture,
            channel,
            narrator,
            events_tx,
            events_rx,
            ui_tx: None,
        };
        runtime.wire_sources();
        runtime
    }

    /// Attach a presentation channel receiving [`UiUpdate`]s.
    pub fn with_ui(mut self, ui_tx: mpsc::UnboundedSender<UiUpdate>) -> Self {
        self.ui_tx = Some(ui_tx);
        self
    }

    /// Control surface for the UI. May be cloned freely.
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            events: self.events_tx.clone(),
            player: Arc::clone(&self.player),
            capture: Arc::clone(&self.capture),
        }
    }

    /// Run the event loop. Runs until the owning task is dropped.
    pub async fn run(mut self) {
        if let Err(e) = self.channel.connect().await {
            warn!("Could not connect to the realtime channel: {}", e);
        }

        while let Some(event) = self.events_rx.recv().await {
            let state_before = self.coordinator.state();
            let processing_before = self.coordinator.is_remote_processing();
            let interim_before = self.coordinator.voice().interim.clone();
            let metadata_before = self
                .coordinator
                .session()
                .map(|s| s.event_metadata.clone());

            let effects = self.coordinator.handle(event);

            for effect in effects {
                self.apply(effect).await;
            }
            self.notify_ui(state_before, processing_before, interim_before, metadata_before);
        }
    }

    fn wire_sources(&self) {
        for kind in InboundKind::ALL {
            let tx = self.events_tx.clone();
            self.channel.on(
                kind,
                Arc::new(move |event| {
                    let _ = tx.send(SessionEvent::Inbound(event.clone()));
                }),
            );
        }

        let mut player_events = self.player.subscribe();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = player_events.recv().await {
                let mapped = match event {
                    PlayerEvent::StateChanged(playing) => SessionEvent::PlayerStateChanged(playing),
                    PlayerEvent::TimeUpdated(time) => SessionEvent::PlayerTime(time),
                };
                if tx.send(mapped).is_err() {
                    break;
                }
            }
        });

        let mut speech_events = self.capture.subscribe();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = speech_events.recv().await {
                let mapped = match event {
                    SpeechEvent::Started => SessionEvent::VoiceStarted,
                    SpeechEvent::Interim(text) => SessionEvent::VoiceInterim(text),
                    SpeechEvent::Final(text) => SessionEvent::VoiceFinal(text),
                    SpeechEvent::Error(kind) => SessionEvent::VoiceError(kind),
                    SpeechEvent::Ended => SessionEvent::VoiceEnded,
                };
                if tx.send(mapped).is_err() {
                    break;
                }
            }
        });

        let mut narration_events = self.narrator.subscribe();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = narration_events.recv().await {
                let mapped = match event {
                    NarrationEvent::Ended { generation } => {
                        SessionEvent::NarrationEnded { generation }
                    }
                    NarrationEvent::Failed {
                        generation,
                        message,
                    } => SessionEvent::NarrationFailed {
                        generation,
                        message,
                    },
                };
                if tx.send(mapped).is_err() {
                    break;
                }
            }
        });
    }

    fn notify_ui(
        &mut self,
        state_before: CoordinatorState,
        processing_before: bool,
        interim_before: String,
        metadata_before: Option<crate::session::EventMetadata>,
    ) {
        let Some(ui) = self.ui_tx.clone() else {
            self.coordinator.take_appended();
            return;
        };

        for item in self.coordinator.take_appended() {
            let _ = ui.send(UiUpdate::Item(item));
        }
        if self.coordinator.state() != state_before {
            let _ = ui.send(UiUpdate::State(self.coordinator.state()));
        }
        if self.coordinator.is_remote_processing() != processing_before {
            let _ = ui.send(UiUpdate::Processing(self.coordinator.is_remote_processing()));
        }
        if self.coordinator.voice().interim != interim_before {
            let _ = ui.send(UiUpdate::Interim(self.coordinator.voice().interim.clone()));
        }
        let metadata_now = self.coordinator.session().map(|s| s.event_metadata.clone());
        if metadata_now != metadata_before {
            if let Some(metadata) = metadata_now {
                let _ = ui.send(UiUpdate::EventMetadata(metadata));
            }
        }
    }

    async fn apply(&self, effect: Effect) {
        match effect {
            Effect::LoadPlayer(video_id) => {
                if let Err(e) = self.player.load(&video_id).await {
                    warn!("Player failed to load {}: {}", video_id, e);
                }
            }
            Effect::PausePlayer => {
                if let Err(e) = self.player.pause().await {
                    warn!("Player pause failed: {}", e);
                }
            }
            Effect::SetPlayerVolume(volume) => {
                if let Err(e) = self.player.set_volume(volume).await {
                    warn!("Player volume change failed: {}", e);
                }
            }
            Effect::SendOutbound(event) => {
                if let Err(e) = self.channel.send(event).await {
                    debug!("Dropped outbound channel event: {}", e);
                }
            }
            Effect::AskQuestion {
                generation,
                request,
            } => {
                let channel = Arc::clone(&self.channel);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let resolution = match channel.ask_question(request).await {
                        Ok(response) => {
                            let audio = response
                                .audio_base64
                                .map(AudioPayload::Base64)
                                .or(response.audio_url.map(AudioPayload::Url));
                            SessionEvent::AnswerArrived {
                                generation,
                                answer: response.answer,
                                audio,
                            }
                        }
                        Err(e) => SessionEvent::QuestionFailed {
                            generation,
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(resolution);
                });
            }
            Effect::PlayNarration {
                generation,
                source,
            } => {
                if let Err(e) = self.narrator.play(generation, source).await {
                    let _ = self.events_tx.send(SessionEvent::NarrationFailed {
                        generation,
                        message: e.to_string(),
                    });
                }
            }
            Effect::StopNarration => self.narrator.stop(),
            Effect::SchedulePulseRevert(delay) => {
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(SessionEvent::PausePulseElapsed);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TimedNarrator;
    use crate::channel::protocol::{
        InboundEvent, OutboundEvent, QuestionRequest, QuestionResponse,
    };
    use crate::channel::{Handler, HandlerId, Subscriptions};
    use crate::config::Settings;
    use crate::error::TolkError;
    use crate::media::SimulatedPlayer;
    use crate::session::CommentaryKind;
    use crate::speech::ManualCapture;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory channel: records traffic, answers from a script.
    struct MockChannel {
        subs: Subscriptions,
        sent: Mutex<Vec<OutboundEvent>>,
        asked: Mutex<Vec<QuestionRequest>>,
        response: Mutex<Option<std::result::Result<QuestionResponse, String>>>,
    }

    impl MockChannel {
        fn new() -> Self {
            Self {
                subs: Subscriptions::new(),
                sent: Mutex::new(Vec::new()),
                asked: Mutex::new(Vec::new()),
                response: Mutex::new(None),
            }
        }

        fn respond_with(&self, response: QuestionResponse) {
            *self.response.lock().unwrap() = Some(Ok(response));
        }

        fn fail_with(&self, message: &str) {
            *self.response.lock().unwrap() = Some(Err(message.to_string()));
        }

        fn push(&self, event: InboundEvent) {
            self.subs.dispatch(&event);
        }
    }

    #[async_trait]
    impl RealtimeChannel for MockChannel {
        async fn connect(&self) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn send(&self, event: OutboundEvent) -> Result<()> {
            self.sent.lock().unwrap().push(event);
            Ok(())
        }

        async fn ask_question(&self, request: QuestionRequest) -> Result<QuestionResponse> {
            self.asked.lock().unwrap().push(request);
            match self.response.lock().unwrap().clone() {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(TolkError::Question(message)),
                None => Err(TolkError::Question("no scripted response".to_string())),
            }
        }

        fn on(&self, kind: InboundKind, handler: Handler) -> HandlerId {
            self.subs.on(kind, handler)
        }

        fn off(&self, kind: InboundKind, id: HandlerId) {
            self.subs.off(kind, id)
        }
    }

    struct Harness {
        handle: CoordinatorHandle,
        ui: mpsc::UnboundedReceiver<UiUpdate>,
        channel: Arc<MockChannel>,
        player: Arc<SimulatedPlayer>,
        capture: Arc<ManualCapture>,
        _loop_task: tokio::task::JoinHandle<()>,
    }

    fn harness() -> Harness {
        let player = Arc::new(SimulatedPlayer::new());
        let capture = Arc::new(ManualCapture::new());
        let channel = Arc::new(MockChannel::new());
        let narrator = Arc::new(TimedNarrator::new());
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        let runtime = Runtime::new(
            CoordinatorConfig::from_settings(&Settings::default()),
            Arc::clone(&player) as Arc<dyn MediaPlayer>,
            Arc::clone(&capture) as Arc<dyn SpeechCapture>,
            Arc::clone(&channel) as Arc<dyn RealtimeChannel>,
            narrator as Arc<dyn NarrationPlayer>,
        )
        .with_ui(ui_tx);
        let handle = runtime.handle();
        let loop_task = tokio::spawn(runtime.run());

        Harness {
            handle,
            ui: ui_rx,
            channel,
            player,
            capture,
            _loop_task: loop_task,
        }
    }

    async fn next_item(ui: &mut mpsc::UnboundedReceiver<UiUpdate>) -> crate::session::CommentaryItem {
        loop {
            match ui.recv().await.expect("ui channel closed") {
                UiUpdate::Item(item) => return item,
                _ => continue,
            }
        }
    }

    async fn wait_for_state(ui: &mut mpsc::UnboundedReceiver<UiUpdate>, state: CoordinatorState) {
        loop {
            if let UiUpdate::State(s) = ui.recv().await.expect("ui channel closed") {
                if s == state {
                    return;
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_question_flow_end_to_end() {
        let mut h = harness();
        h.channel.respond_with(QuestionResponse {
            answer: "Team A".to_string(),
            audio_url: Some("/audio/1".to_string()),
            ..Default::default()
        });

        h.handle.load_video("abc123def45", false);
        let status = next_item(&mut h.ui).await;
        assert_eq!(status.kind, CommentaryKind::Status);

        h.handle.submit_text("Who is playing?");
        let question = next_item(&mut h.ui).await;
        assert_eq!(question.kind, CommentaryKind::UserQuestion);
        assert_eq!(question.text, "Who is playing?");

        let answer = next_item(&mut h.ui).await;
        assert_eq!(answer.kind, CommentaryKind::Analysis);
        assert_eq!(answer.text, "Team A");

        // Narration plays, then the coordinator settles back to Ready.
        wait_for_state(&mut h.ui, CoordinatorState::Ready).await;

        let asked = h.channel.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].video_id, "abc123def45");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_failure_reports_and_recovers() {
        let mut h = harness();
        h.channel.fail_with("rate limited");

        h.handle.load_video("abc123def45", false);
        next_item(&mut h.ui).await;

        h.handle.submit_text("Who leads?");
        next_item(&mut h.ui).await; // the question itself

        let error = next_item(&mut h.ui).await;
        assert_eq!(error.kind, CommentaryKind::Error);
        assert!(error.text.contains("rate limited"));
        wait_for_state(&mut h.ui, CoordinatorState::Ready).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_capture_pauses_video_and_auto_submits() {
        let mut h = harness();
        h.channel.respond_with(QuestionResponse {
            answer: "A triple axel.".to_string(),
            ..Default::default()
        });

        h.handle.load_video("abc123def45", false);
        next_item(&mut h.ui).await;
        h.handle.play().await.unwrap();
        assert!(h.player.is_playing());

        h.handle.start_voice().await.unwrap();
        h.capture.dictate_final("what was that jump");

        let question = next_item(&mut h.ui).await;
        assert_eq!(question.kind, CommentaryKind::UserQuestion);
        assert_eq!(question.text, "what was that jump");

        // The auto-pause pulse paused the player once.
        assert!(!h.player.is_playing());

        let answer = next_item(&mut h.ui).await;
        assert_eq!(answer.text, "A triple axel.");
        wait_for_state(&mut h.ui, CoordinatorState::Ready).await;

        // The pulse reverts; the user can play again.
        h.handle.play().await.unwrap();
        assert!(h.player.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushed_commentary_reaches_ui() {
        let mut h = harness();
        h.handle.load_video("abc123def45", false);
        next_item(&mut h.ui).await;

        h.channel.push(InboundEvent::PushCommentary(
            crate::channel::protocol::CommentaryPush {
                item_type: "analysis".to_string(),
                content: "Conditions are turning icy.".to_string(),
                ..Default::default()
            },
        ));

        let item = next_item(&mut h.ui).await;
        assert_eq!(item.kind, CommentaryKind::Analysis);
        assert_eq!(item.text, "Conditions are turning icy.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_before_loop_start_are_not_lost() {
        let player = Arc::new(SimulatedPlayer::new());
        let capture = Arc::new(ManualCapture::new());
        let channel = Arc::new(MockChannel::new());
        let narrator = Arc::new(TimedNarrator::new());

        let runtime = Runtime::new(
            CoordinatorConfig::from_settings(&Settings::default()),
            Arc::clone(&player) as Arc<dyn MediaPlayer>,
            Arc::clone(&capture) as Arc<dyn SpeechCapture>,
            Arc::clone(&channel) as Arc<dyn RealtimeChannel>,
            narrator as Arc<dyn NarrationPlayer>,
        );
        let handle = runtime.handle();

        // Voice starts before the loop task exists; the event must still land.
        handle.load_video("abc123def45", false);
        handle.start_voice().await.unwrap();

        tokio::spawn(runtime.run());
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;

        assert_eq!(player.volume(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ducking_applied_to_player_during_voice() {
        let h = harness();
        h.handle.load_video("abc123def45", false);
        h.handle.start_voice().await.unwrap();

        // Let the loop drain the capture event before asserting.
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;

        assert_eq!(h.player.volume(), 20);
    }
}
