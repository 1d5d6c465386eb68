//! The interaction coordinator.
//!
//! A state machine arbitrating between video playback, voice capture,
//! outbound question requests, and inbound AI responses. The coordinator is
//! a pure reducer: [`Coordinator::handle`] consumes one [`SessionEvent`] and
//! returns the [`Effect`]s to apply, never performing I/O itself. The
//! [`runtime`] module drives it against the collaborator traits.
//!
//! Cancellation is generation-based: every question takes a fresh generation
//! number, and answers, failures, and narration completions carrying a stale
//! generation are discarded. A cancelled clip's end event can therefore never
//! resurface after a new question starts.

mod ducking;
mod event;
pub mod runtime;

pub use ducking::DuckingControl;
pub use event::{CoordinatorState, Effect, SessionEvent, UiUpdate};
pub use runtime::{CoordinatorHandle, Runtime};

use crate::audio::{AudioPayload, NarrationSource};
use crate::channel::protocol::{
    AudioResponse, Empty, InboundEvent, OutboundEvent, PlaybackUpdate, QuestionRequest,
};
use crate::config::Settings;
use crate::session::{
    CommentaryItem, CommentaryKind, CommentaryPayload, Session, VoiceCaptureState,
};
use crate::speech::SpeechErrorKind;
use std::time::Duration;
use tracing::debug;

/// Coordinator-relevant slice of [`Settings`], injected at construction and
/// replaceable at runtime.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub ducking_percent: u8,
    pub default_volume: u8,
    pub auto_submit_voice: bool,
    pub max_log_size: usize,
    pub pause_pulse: Duration,
    pub update_interval_seconds: u64,
}

impl CoordinatorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            ducking_percent: settings.playback.ducking_percent,
            default_volume: settings.playback.default_volume,
            auto_submit_voice: settings.voice.auto_submit,
            max_log_size: settings.commentary.max_log_size,
            pause_pulse: Duration::from_millis(settings.voice.pause_pulse_ms),
            update_interval_seconds: settings.playback.update_interval_seconds.max(1),
        }
    }
}

/// The session state machine.
pub struct Coordinator {
    config: CoordinatorConfig,
    state: CoordinatorState,
    session: Option<Session>,
    voice: VoiceCaptureState,
    ducking: DuckingControl,
    /// Generation of the one question currently in flight, if any.
    inflight: Option<u64>,
    /// Generation of the narration currently playing, if any.
    narrating: Option<u64>,
    next_generation: u64,
    /// Last whole second already notified to the channel.
    last_update_second: Option<u64>,
    /// True during the auto-pause pulse after voice capture starts.
    auto_paused: bool,
    remote_processing: bool,
    speech_unavailable_reported: bool,
    appended: Vec<CommentaryItem>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let ducking = DuckingControl::new(config.default_volume, config.ducking_percent);
        Self {
            config,
            state: CoordinatorState::Idle,
            session: None,
            voice: VoiceCaptureState::default(),
            ducking,
            inflight: None,
            narrating: None,
            next_generation: 0,
            last_update_second: None,
            auto_paused: false,
            remote_processing: false,
            speech_unavailable_reported: false,
            appended: Vec::new(),
        }
    }

    /// Replace the injected configuration (settings changed at runtime).
    pub fn set_config(&mut self, config: CoordinatorConfig) {
        self.ducking.set_ducking_percent(config.ducking_percent);
        self.config = config;
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn voice(&self) -> &VoiceCaptureState {
        &self.voice
    }

    pub fn ducking(&self) -> &DuckingControl {
        &self.ducking
    }

    pub fn is_remote_processing(&self) -> bool {
        self.remote_processing
    }

    pub fn is_auto_paused(&self) -> bool {
        self.auto_paused
    }

    /// Drain the commentary items appended by the last `handle` call.
    pub fn take_appended(&mut self) -> Vec<CommentaryItem> {
        std::mem::take(&mut self.appended)
    }

    /// Process one event and return the side effects to apply. Transitions
    /// are serialized by the caller; no two run concurrently.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        self.appended.clear();
        let mut effects = Vec::new();

        match event {
            SessionEvent::LoadVideo { video_id, is_live } => {
                self.load_video(video_id, is_live, &mut effects)
            }
            SessionEvent::SubmitText(text) => self.submit_question(text, &mut effects),
            SessionEvent::VoiceStarted => self.voice_started(&mut effects),
            SessionEvent::VoiceInterim(text) => {
                if self.voice.listening {
                    self.voice.interim = text;
                }
            }
            SessionEvent::VoiceFinal(text) => {
                if self.voice.listening {
                    self.voice.final_text = Some(text);
                }
            }
            SessionEvent::VoiceEnded => self.voice_ended(&mut effects),
            SessionEvent::VoiceError(kind) => self.voice_error(kind),
            SessionEvent::PlayerTime(time) => self.player_time(time, &mut effects),
            SessionEvent::PlayerStateChanged(playing) => {
                if let Some(session) = self.session.as_mut() {
                    session.playing = playing;
                }
            }
            SessionEvent::UserSetVolume(volume) => self.ducking.set_baseline(volume),
            SessionEvent::UserSetMuted(muted) => self.ducking.set_muted(muted),
            SessionEvent::PausePulseElapsed => self.auto_paused = false,
            SessionEvent::AnswerArrived {
                generation,
                answer,
                audio,
            } => self.answer_arrived(generation, answer, audio, &mut effects),
            SessionEvent::QuestionFailed {
                generation,
                message,
            } => self.question_failed(generation, message),
            SessionEvent::NarrationEnded { generation } => self.narration_done(generation, None),
            SessionEvent::NarrationFailed {
                generation,
                message,
            } => self.narration_done(generation, Some(message)),
            SessionEvent::Inbound(inbound) => self.inbound(inbound, &mut effects),
        }

        if let Some(volume) = self.ducking.sync() {
            effects.push(Effect::SetPlayerVolume(volume));
        }
        effects
    }

    fn append(&mut self, item: CommentaryItem) {
        if let Some(session) = self.session.as_mut() {
            session.log.push(item.clone());
        }
        self.appended.push(item);
    }

    fn load_video(&mut self, video_id: String, is_live: bool, effects: &mut Vec<Effect>) {
        // Everything in-flight belongs to the previous video.
        if self.narrating.take().is_some() {
            effects.push(Effect::StopNarration);
        }
        self.inflight = None;
        self.remote_processing = false;
        self.voice.clear();
        self.ducking.set_voice_listening(false);
        self.ducking.set_ai_audio_playing(false);
        self.last_update_second = None;
        self.auto_paused = false;

        self.session = Some(Session::new(
            video_id.clone(),
            is_live,
            self.config.max_log_size,
        ));
        self.state = CoordinatorState::Ready;

        let text = if is_live {
            format!(
                "Live stream {} loaded. Ask me anything about what's happening.",
                video_id
            )
        } else {
            format!("Video {} loaded. Ask me anything about what's happening.", video_id)
        };
        self.append(CommentaryItem::new(CommentaryKind::Status, text));
        effects.push(Effect::LoadPlayer(video_id));
    }

    fn submit_question(&mut self, text: String, effects: &mut Vec<Effect>) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        let Some(session) = self.session.as_ref() else {
            self.append(CommentaryItem::new(
                CommentaryKind::Status,
                "Load a video first, then ask your question again.",
            ));
            return;
        };

        // A new submission always wins: stop stale narration before anything
        // else so its end event cannot race the new request.
        if self.narrating.take().is_some() {
            effects.push(Effect::StopNarration);
            self.ducking.set_ai_audio_playing(false);
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.inflight = Some(generation);

        let request = QuestionRequest {
            question: text.clone(),
            video_id: session.video_id.clone(),
            playback_time: session.playback_time,
            is_live: session.is_live,
            visual_snapshot: None,
        };

        self.append(CommentaryItem::new(CommentaryKind::UserQuestion, text));
        self.state = CoordinatorState::AwaitingAnswer;
        effects.push(Effect::AskQuestion {
            generation,
            request,
        });
    }

    fn voice_started(&mut self, effects: &mut Vec<Effect>) {
        self.voice.clear();
        self.voice.listening = true;
        self.ducking.set_voice_listening(true);

        // Auto-pause is a pulse, not a hold: the flag reverts after the
        // delay and the user keeps full control of the player throughout.
        self.auto_paused = true;
        effects.push(Effect::PausePlayer);
        effects.push(Effect::SendOutbound(OutboundEvent::VoiceDetected(Empty {})));
        effects.push(Effect::SchedulePulseRevert(self.config.pause_pulse));
    }

    fn voice_ended(&mut self, effects: &mut Vec<Effect>) {
        self.voice.listening = false;
        self.voice.interim.clear();
        self.ducking.set_voice_listening(false);

        if let Some(text) = self.voice.final_text.take() {
            if self.config.auto_submit_voice {
                self.submit_question(text, effects);
            } else {
                // Leave the transcript for manual edit/submit.
                self.append(CommentaryItem::new(
                    CommentaryKind::LiveDictation,
                    text.clone(),
                ));
                self.voice.final_text = Some(text);
            }
        }
    }

    fn voice_error(&mut self, kind: SpeechErrorKind) {
        self.voice.clear();
        self.ducking.set_voice_listening(false);

        match kind {
            SpeechErrorKind::Unavailable => {
                if !self.speech_unavailable_reported {
                    self.speech_unavailable_reported = true;
                    self.append(CommentaryItem::new(
                        CommentaryKind::Error,
                        "Speech recognition isn't available here. You can still type your questions.",
                    ));
                }
            }
            SpeechErrorKind::PermissionDenied => {
                self.append(CommentaryItem::new(
                    CommentaryKind::Error,
                    "Microphone access was denied. Check your permissions and try again.",
                ));
            }
            SpeechErrorKind::Aborted => {
                // User-initiated stop, not an error.
            }
            SpeechErrorKind::Transient => {
                self.append(CommentaryItem::new(
                    CommentaryKind::Error,
                    "Speech capture hiccuped. Try speaking again.",
                ));
            }
        }
    }

    fn player_time(&mut self, time: f64, effects: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.playback_time = time;

        // Skip-based throttling: notify only on whole seconds divisible by
        // the interval, once per boundary.
        let whole = time.floor() as u64;
        if whole % self.config.update_interval_seconds == 0
            && self.last_update_second != Some(whole)
        {
            self.last_update_second = Some(whole);
            effects.push(Effect::SendOutbound(OutboundEvent::PlaybackUpdate(
                PlaybackUpdate {
                    video_id: session.video_id.clone(),
                    playback_time: time,
                },
            )));
        }
    }

    fn answer_arrived(
        &mut self,
        generation: u64,
        answer: String,
        audio: Option<AudioPayload>,
        effects: &mut Vec<Effect>,
    ) {
        if self.inflight != Some(generation) {
            debug!("Discarding stale answer for generation {}", generation);
            return;
        }
        self.inflight = None;

        self.append(CommentaryItem::new(CommentaryKind::Analysis, answer.clone()));

        match audio {
            Some(audio) => {
                self.narrating = Some(generation);
                self.ducking.set_ai_audio_playing(true);
                self.state = CoordinatorState::Narrating;
                effects.push(Effect::PlayNarration {
                    generation,
                    source: NarrationSource {
                        text: answer,
                        audio: Some(audio),
                    },
                });
            }
            None => {
                self.state = CoordinatorState::Ready;
            }
        }
    }

    fn question_failed(&mut self, generation: u64, message: String) {
        if self.inflight != Some(generation) {
            debug!("Discarding stale failure for generation {}", generation);
            return;
        }
        self.inflight = None;
        self.append(CommentaryItem::new(
            CommentaryKind::Error,
            format!("Couldn't get an answer: {}", message),
        ));
        self.state = CoordinatorState::Ready;
    }

    fn narration_done(&mut self, generation: u64, failure: Option<String>) {
        if self.narrating != Some(generation) {
            debug!("Discarding stale narration event for generation {}", generation);
            return;
        }
        self.narrating = None;
        self.ducking.set_ai_audio_playing(false);

        if let Some(message) = failure {
            self.append(CommentaryItem::new(
                CommentaryKind::Error,
                format!("Narration playback failed: {}", message),
            ));
        }
        if self.state == CoordinatorState::Narrating {
            self.state = CoordinatorState::Ready;
        }
    }

    fn inbound(&mut self, event: InboundEvent, effects: &mut Vec<Effect>) {
        match event {
            InboundEvent::AudioResponse(response) => self.audio_response(response, effects),
            InboundEvent::PauseVideo(_) => effects.push(Effect::PausePlayer),
            InboundEvent::ProcessingStart(_) => self.remote_processing = true,
            InboundEvent::ProcessingComplete(_) => self.remote_processing = false,
            InboundEvent::Error(error) => {
                if matches!(
                    self.state,
                    CoordinatorState::AwaitingAnswer | CoordinatorState::Narrating
                ) {
                    self.inflight = None;
                    if self.narrating.take().is_some() {
                        effects.push(Effect::StopNarration);
                        self.ducking.set_ai_audio_playing(false);
                    }
                    self.state = CoordinatorState::Ready;
                }
                self.append(CommentaryItem::new(
                    CommentaryKind::Error,
                    format!("The commentary service reported a problem: {}", error.message),
                ));
            }
            InboundEvent::PushCommentary(card) => {
                if self.session.is_none() {
                    return;
                }
                let kind = CommentaryKind::from_push_type(&card.item_type);
                let item = CommentaryItem::new(kind, card.content).with_payload(CommentaryPayload {
                    title: card.title,
                    highlight: card.highlight,
                    comparison: card.comparison,
                });
                self.append(item);
            }
            InboundEvent::PushEventUpdate(update) => {
                if let Some(session) = self.session.as_mut() {
                    session.event_metadata.merge(update);
                }
            }
            InboundEvent::TranscriptUpdate(update) => {
                if let Some(session) = self.session.as_mut() {
                    session.push_transcript(update.entry);
                }
            }
        }
    }

    /// An `AUDIO_RESPONSE` push either answers the in-flight question or, if
    /// nothing is pending, delivers proactive narration.
    fn audio_response(&mut self, response: AudioResponse, effects: &mut Vec<Effect>) {
        let audio = response
            .audio_base64
            .map(AudioPayload::Base64)
            .or(response.audio_url.map(AudioPayload::Url));

        if let Some(generation) = self.inflight {
            let answer = response.answer.unwrap_or_default();
            self.answer_arrived(generation, answer, audio, effects);
            return;
        }

        if self.session.is_none() {
            return;
        }
        let Some(answer) = response.answer else {
            return;
        };

        self.append(CommentaryItem::new(CommentaryKind::Narration, answer.clone()));
        if let Some(audio) = audio {
            if self.state == CoordinatorState::Ready {
                self.next_generation += 1;
                let generation = self.next_generation;
                self.narrating = Some(generation);
                self.ducking.set_ai_audio_playing(true);
                self.state = CoordinatorState::Narrating;
                effects.push(Effect::PlayNarration {
                    generation,
                    source: NarrationSource {
                        text: answer,
                        audio: Some(audio),
                    },
                });
            }
        }
    }
}
