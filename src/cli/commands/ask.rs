//! One-shot question command.

use crate::channel::protocol::{QuestionRequest, QuestionResponse};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::{Result, TolkError};
use console::style;
use std::time::Duration;

/// Ask a question about a video through the companion server.
pub async fn run_ask(
    question: &str,
    video: Option<String>,
    time: f64,
    settings: Settings,
) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.channel.request_timeout_seconds))
        .build()?;

    let request = QuestionRequest {
        question: question.to_string(),
        video_id: video.unwrap_or_default(),
        playback_time: time,
        is_live: false,
        visual_snapshot: None,
    };

    let spinner = Output::spinner("Thinking...");

    let url = format!("{}/question", settings.channel.api_base_url);
    let result = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .and_then(|r| r.error_for_status());

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error("Could not reach the companion server.");
            Output::info("Start it with 'tolk serve'.");
            return Err(TolkError::Question(e.to_string()));
        }
    };

    let answer: QuestionResponse = response
        .json()
        .await
        .map_err(|e| TolkError::MalformedResponse(e.to_string()))?;

    spinner.finish_and_clear();

    println!("\n{} {}\n", style("Tolk:").cyan().bold(), answer.answer);

    if let Some(audio_url) = &answer.audio_url {
        Output::kv(
            "Audio",
            &format!("{}{}", settings.channel.api_base_url, audio_url),
        );
    }
    if !answer.transcript_context.is_empty() {
        Output::header("Transcript context");
        for entry in &answer.transcript_context {
            Output::list_item(&entry.format_timed());
        }
    }

    Ok(())
}
