//! YouTube video identification and metadata.
//!
//! Metadata comes from the public oEmbed endpoint, which needs no API key.
//! Lookups are best-effort: a failed fetch falls back to placeholder
//! metadata rather than failing the load.

use crate::error::{Result, TolkError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Basic video metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

fn video_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // Matches watch/short/embed/live URLs and bare 11-character ids.
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/live/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

/// Extract a video id from a YouTube URL or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = video_id_regex().captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

/// Fetch metadata for a video via oEmbed. Falls back to placeholders if the
/// lookup fails (private videos, network trouble).
pub async fn fetch_metadata(client: &reqwest::Client, video_id: &str) -> Result<VideoMetadata> {
    if extract_video_id(video_id).is_none() {
        return Err(TolkError::InvalidVideo(video_id.to_string()));
    }

    let url = format!(
        "https://www.youtube.com/oembed?url=https://www.youtube.com/watch?v={}&format=json",
        video_id
    );

    let mut metadata = VideoMetadata {
        video_id: video_id.to_string(),
        title: "Unknown Title".to_string(),
        ..Default::default()
    };

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<OEmbedResponse>().await {
                Ok(oembed) => {
                    if let Some(title) = oembed.title {
                        metadata.title = title;
                    }
                    metadata.author = oembed.author_name;
                    metadata.thumbnail_url = oembed.thumbnail_url;
                }
                Err(e) => warn!("Could not parse oEmbed response for {}: {}", video_id, e),
            }
        }
        Ok(response) => {
            debug!("oEmbed returned {} for {}", response.status(), video_id);
        }
        Err(e) => warn!("Could not fetch metadata for {}: {}", video_id, e),
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_from_short_and_live_urls() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/live/jfKfPfyJRdk"),
            Some("jfKfPfyJRdk".to_string())
        );
    }

    #[test]
    fn test_extract_bare_id() {
        assert_eq!(
            extract_video_id("dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(extract_video_id("not a video"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=short"), None);
    }
}
