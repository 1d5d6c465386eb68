//! Session state and the commentary log.
//!
//! A [`Session`] represents one active video context. It is created when a
//! video is loaded, mutated by every coordinator event, and replaced wholesale
//! when a new video is loaded.

use crate::transcript::TranscriptEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Display kind of a commentary item. The coordinator tags items at creation
/// and never interprets the kind afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentaryKind {
    Status,
    Analysis,
    Narration,
    UserQuestion,
    #[serde(rename = "player_profile")]
    Profile,
    LiveDictation,
    Error,
}

impl CommentaryKind {
    /// Map a pushed item type string to a kind. Unknown types render as
    /// analysis cards.
    pub fn from_push_type(s: &str) -> Self {
        match s {
            "status" => CommentaryKind::Status,
            "narration" => CommentaryKind::Narration,
            "user_question" => CommentaryKind::UserQuestion,
            "player_profile" => CommentaryKind::Profile,
            "live_dictation" => CommentaryKind::LiveDictation,
            "error" => CommentaryKind::Error,
            _ => CommentaryKind::Analysis,
        }
    }
}

/// Highlight attachment on a commentary card (source link, profile image,
/// quick stats).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stats: Vec<String>,
}

/// Historical comparison numbers attached to a commentary card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub current: f64,
    pub record: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Optional structured payload on a commentary item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentaryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

impl CommentaryPayload {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.highlight.is_none() && self.comparison.is_none()
    }
}

/// One entry in the commentary log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryItem {
    pub id: Uuid,
    pub kind: CommentaryKind,
    pub at: DateTime<Utc>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<CommentaryPayload>,
}

impl CommentaryItem {
    pub fn new(kind: CommentaryKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            at: Utc::now(),
            text: text.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: CommentaryPayload) -> Self {
        if !payload.is_empty() {
            self.payload = Some(payload);
        }
        self
    }
}

/// Bounded commentary log, iterated newest-first. Oldest entries are evicted
/// on overflow.
#[derive(Debug, Clone)]
pub struct CommentaryLog {
    items: VecDeque<CommentaryItem>,
    capacity: usize,
}

impl CommentaryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Append a new item (becomes the newest entry). Evicts the oldest item
    /// when the log is full.
    pub fn push(&mut self, item: CommentaryItem) {
        if self.items.len() == self.capacity {
            self.items.pop_back();
        }
        self.items.push_front(item);
    }

    /// Iterate items newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &CommentaryItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn newest(&self) -> Option<&CommentaryItem> {
        self.items.front()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Transient per-utterance voice capture state.
#[derive(Debug, Clone, Default)]
pub struct VoiceCaptureState {
    pub listening: bool,
    pub interim: String,
    pub final_text: Option<String>,
}

impl VoiceCaptureState {
    pub fn clear(&mut self) {
        self.listening = false;
        self.interim.clear();
        self.final_text = None;
    }
}

/// Risk warning pushed as part of event metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWarning {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Live event sidebar metadata, merged from partial `PUSH_EVENT_UPDATE`
/// messages. Wire field names are camelCase to match the push producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_warning: Option<RiskWarning>,
}

impl EventMetadata {
    /// Merge a partial update; fields absent from the update keep their value.
    pub fn merge(&mut self, update: EventMetadata) {
        if update.win_probability.is_some() {
            self.win_probability = update.win_probability;
        }
        if update.probability_change.is_some() {
            self.probability_change = update.probability_change;
        }
        if update.technical_score.is_some() {
            self.technical_score = update.technical_score;
        }
        if update.risk_warning.is_some() {
            self.risk_warning = update.risk_warning;
        }
    }
}

/// How many live transcript entries the session keeps around for display.
const LIVE_TRANSCRIPT_KEEP: usize = 20;

/// One active video context.
#[derive(Debug, Clone)]
pub struct Session {
    pub video_id: String,
    pub is_live: bool,
    pub playing: bool,
    pub playback_time: f64,
    pub log: CommentaryLog,
    pub event_metadata: EventMetadata,
    pub live_transcript: VecDeque<TranscriptEntry>,
}

impl Session {
    pub fn new(video_id: impl Into<String>, is_live: bool, max_log_size: usize) -> Self {
        Self {
            video_id: video_id.into(),
            is_live,
            playing: false,
            playback_time: 0.0,
            log: CommentaryLog::new(max_log_size),
            event_metadata: EventMetadata::default(),
            live_transcript: VecDeque::new(),
        }
    }

    pub fn push_transcript(&mut self, entry: TranscriptEntry) {
        if self.live_transcript.len() == LIVE_TRANSCRIPT_KEEP {
            self.live_transcript.pop_front();
        }
        self.live_transcript.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_bounded_and_evicts_oldest() {
        let mut log = CommentaryLog::new(3);
        for i in 0..5 {
            log.push(CommentaryItem::new(CommentaryKind::Status, format!("item {}", i)));
        }

        assert_eq!(log.len(), 3);
        let texts: Vec<&str> = log.iter().map(|i| i.text.as_str()).collect();
        // Newest first; items 0 and 1 were evicted.
        assert_eq!(texts, vec!["item 4", "item 3", "item 2"]);
    }

    #[test]
    fn test_log_newest_first_order() {
        let mut log = CommentaryLog::new(10);
        log.push(CommentaryItem::new(CommentaryKind::UserQuestion, "first"));
        log.push(CommentaryItem::new(CommentaryKind::Analysis, "second"));

        assert_eq!(log.newest().unwrap().text, "second");
    }

    #[test]
    fn test_event_metadata_partial_merge() {
        let mut meta = EventMetadata {
            win_probability: Some(60.0),
            technical_score: Some(88.5),
            ..Default::default()
        };

        meta.merge(EventMetadata {
            win_probability: Some(65.0),
            probability_change: Some(5.0),
            ..Default::default()
        });

        assert_eq!(meta.win_probability, Some(65.0));
        assert_eq!(meta.probability_change, Some(5.0));
        assert_eq!(meta.technical_score, Some(88.5));
    }

    #[test]
    fn test_push_type_mapping() {
        assert_eq!(CommentaryKind::from_push_type("player_profile"), CommentaryKind::Profile);
        assert_eq!(CommentaryKind::from_push_type("narration"), CommentaryKind::Narration);
        assert_eq!(CommentaryKind::from_push_type("historical"), CommentaryKind::Analysis);
        assert_eq!(CommentaryKind::from_push_type("market_shift"), CommentaryKind::Analysis);
    }
}
