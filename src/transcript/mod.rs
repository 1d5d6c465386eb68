//! Transcript storage and context windows.
//!
//! Transcripts live in memory for the lifetime of the server process. For a
//! livestream, entries arrive over the transcript WebSocket and are appended
//! as they are produced.

use crate::server::youtube::VideoMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One caption segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    pub text: String,
}

impl TranscriptEntry {
    /// Render as `[m:ss] text`, the shape handed to the answer engine.
    pub fn format_timed(&self) -> String {
        let minutes = (self.start / 60.0) as u64;
        let seconds = (self.start % 60.0) as u64;
        format!("[{}:{:02}] {}", minutes, seconds, self.text)
    }
}

/// In-memory transcript and metadata store, keyed by video id.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    transcripts: RwLock<HashMap<String, Vec<TranscriptEntry>>>,
    metadata: RwLock<HashMap<String, VideoMetadata>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transcript for a video.
    pub fn set_transcript(&self, video_id: &str, entries: Vec<TranscriptEntry>) {
        self.transcripts
            .write()
            .expect("transcript store lock poisoned")
            .insert(video_id.to_string(), entries);
    }

    /// Append a live transcript entry, keeping entries in start-time order.
    pub fn add_live_entry(&self, video_id: &str, entry: TranscriptEntry) {
        let mut map = self
            .transcripts
            .write()
            .expect("transcript store lock poisoned");
        let entries = map.entry(video_id.to_string()).or_default();
        entries.push(entry);
        entries.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    /// Full transcript for a video, if one was loaded.
    pub fn full_transcript(&self, video_id: &str) -> Option<Vec<TranscriptEntry>> {
        self.transcripts
            .read()
            .expect("transcript store lock poisoned")
            .get(video_id)
            .cloned()
    }

    /// Entries ending within `window_seconds` before `current_time`.
    pub fn window(&self, video_id: &str, current_time: f64, window_seconds: f64) -> Vec<TranscriptEntry> {
        let from = (current_time - window_seconds).max(0.0);
        self.transcripts
            .read()
            .expect("transcript store lock poisoned")
            .get(video_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.start >= from && e.start <= current_time)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_metadata(&self, video_id: &str, metadata: VideoMetadata) {
        self.metadata
            .write()
            .expect("transcript store lock poisoned")
            .insert(video_id.to_string(), metadata);
    }

    pub fn metadata(&self, video_id: &str) -> Option<VideoMetadata> {
        self.metadata
            .read()
            .expect("transcript store lock poisoned")
            .get(video_id)
            .cloned()
    }

    /// Context text for the answer engine: the recent transcript window when
    /// captions exist, video metadata otherwise.
    pub fn context_text(&self, video_id: &str, current_time: f64, window_seconds: f64) -> String {
        let entries = self.window(video_id, current_time, window_seconds);
        if !entries.is_empty() {
            let formatted: Vec<String> = entries.iter().map(|e| e.format_timed()).collect();
            return format!("Recent commentary transcript:\n{}", formatted.join("\n"));
        }

        if let Some(meta) = self.metadata(video_id) {
            let mut parts = Vec::new();
            if !meta.title.is_empty() {
                parts.push(format!("Video Title: {}", meta.title));
            }
            if let Some(author) = &meta.author {
                parts.push(format!("Channel: {}", author));
            }
            if let Some(description) = &meta.description {
                if !description.is_empty() {
                    parts.push(format!("Description: {}", description));
                }
            }
            if !parts.is_empty() {
                return format!(
                    "Video information (no transcript available):\n{}",
                    parts.join("\n")
                );
            }
        }

        "No transcript or video information available.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: f64, text: &str) -> TranscriptEntry {
        TranscriptEntry {
            start,
            duration: 5.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_window_filters_by_time() {
        let store = TranscriptStore::new();
        store.set_transcript(
            "vid1",
            vec![entry(0.0, "opening"), entry(40.0, "mid"), entry(70.0, "late")],
        );

        let window = store.window("vid1", 75.0, 30.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].text, "late");
    }

    #[test]
    fn test_live_entries_stay_ordered() {
        let store = TranscriptStore::new();
        store.add_live_entry("live1", entry(20.0, "second"));
        store.add_live_entry("live1", entry(5.0, "first"));

        let all = store.full_transcript("live1").unwrap();
        assert_eq!(all[0].text, "first");
        assert_eq!(all[1].text, "second");
    }

    #[test]
    fn test_context_falls_back_to_metadata() {
        let store = TranscriptStore::new();
        store.set_metadata(
            "vid2",
            VideoMetadata {
                video_id: "vid2".to_string(),
                title: "Downhill Final".to_string(),
                author: Some("Alpine TV".to_string()),
                description: None,
                thumbnail_url: None,
            },
        );

        let context = store.context_text("vid2", 10.0, 30.0);
        assert!(context.contains("no transcript available"));
        assert!(context.contains("Downhill Final"));
    }

    #[test]
    fn test_timed_formatting() {
        assert_eq!(entry(95.0, "jump").format_timed(), "[1:35] jump");
    }
}
