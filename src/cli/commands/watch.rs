//! Interactive watch session.
//!
//! Runs the coordinator against the simulated player, manual dictation, and
//! the WebSocket channel, with a line-oriented control surface on stdin.
//! Commentary items and state changes print as they arrive.

use crate::audio::TimedNarrator;
use crate::channel::protocol::{VideoLoadRequest, VideoLoadResponse};
use crate::channel::WsChannel;
use crate::cli::Output;
use crate::config::Settings;
use crate::coordinator::runtime::{CoordinatorHandle, Runtime};
use crate::coordinator::{CoordinatorConfig, CoordinatorState, UiUpdate};
use crate::error::Result;
use crate::media::SimulatedPlayer;
use crate::session::CommentaryKind;
use crate::speech::{ManualCapture, SpeechCapture};
use console::style;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Run the interactive watch session.
pub async fn run_watch(url: Option<String>, settings: Settings) -> Result<()> {
    let player = Arc::new(SimulatedPlayer::new());
    player.start_clock();
    let capture = Arc::new(ManualCapture::new());
    let channel = Arc::new(WsChannel::new(&settings.channel)?);
    let narrator = Arc::new(TimedNarrator::new());

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let runtime = Runtime::new(
        CoordinatorConfig::from_settings(&settings),
        player,
        Arc::clone(&capture) as Arc<dyn SpeechCapture>,
        channel,
        narrator,
    )
    .with_ui(ui_tx);
    let handle = runtime.handle();
    tokio::spawn(runtime.run());

    let api = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.channel.request_timeout_seconds))
        .build()?;

    println!("\n{}", style("Tolk Watch").bold().cyan());
    println!(
        "{}\n",
        style("Type a question, or a command: :load URL, :play, :pause, :volume N, :mute, :unmute, :voice TEXT, exit.")
            .dim()
    );

    if let Some(url) = url {
        load(&handle, &api, &settings, &url).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                    Output::info("Goodbye!");
                    break;
                }
                dispatch(&handle, capture.as_ref(), &api, &settings, input).await;
            }
            update = ui_rx.recv() => {
                let Some(update) = update else { break };
                render(&update, &settings);
            }
        }
    }

    Ok(())
}

async fn dispatch(
    handle: &CoordinatorHandle,
    capture: &ManualCapture,
    api: &reqwest::Client,
    settings: &Settings,
    input: &str,
) {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        ":load" => {
            if rest.is_empty() {
                Output::warning("Usage: :load <youtube-url-or-id>");
                return;
            }
            load(handle, api, settings, rest).await;
        }
        ":play" => {
            if let Err(e) = handle.play().await {
                Output::error(&format!("{}", e));
            }
        }
        ":pause" => {
            if let Err(e) = handle.pause().await {
                Output::error(&format!("{}", e));
            }
        }
        ":volume" => match rest.parse::<u8>() {
            Ok(percent) if percent <= 100 => handle.set_volume(percent),
            _ => Output::warning("Usage: :volume <0-100>"),
        },
        ":mute" => {
            if let Err(e) = handle.set_muted(true).await {
                Output::error(&format!("{}", e));
            }
        }
        ":unmute" => {
            if let Err(e) = handle.set_muted(false).await {
                Output::error(&format!("{}", e));
            }
        }
        ":voice" => {
            // Simulated dictation: capture starts, the text arrives as the
            // final transcript, then capture ends.
            if rest.is_empty() {
                Output::warning("Usage: :voice <spoken text>");
                return;
            }
            if let Err(e) = handle.start_voice().await {
                Output::error(&format!("{}", e));
                return;
            }
            capture.dictate_final(rest);
        }
        _ if command.starts_with(':') => {
            Output::warning(&format!("Unknown command: {}", command));
        }
        _ => handle.submit_text(input),
    }
}

async fn load(handle: &CoordinatorHandle, api: &reqwest::Client, settings: &Settings, url: &str) {
    let request = VideoLoadRequest {
        url: url.to_string(),
    };
    let endpoint = format!("{}/video/load", settings.channel.api_base_url);

    let response = api
        .post(&endpoint)
        .json(&request)
        .send()
        .await
        .and_then(|r| r.error_for_status());

    match response {
        Ok(response) => match response.json::<VideoLoadResponse>().await {
            Ok(loaded) => {
                Output::success(&format!(
                    "Loaded '{}'{}",
                    loaded.title,
                    if loaded.is_live { " (live)" } else { "" }
                ));
                Output::info(&loaded.message);
                handle.load_video(&loaded.video_id, loaded.is_live);
            }
            Err(e) => Output::error(&format!("Unexpected load response: {}", e)),
        },
        Err(e) => {
            Output::error(&format!("Could not load video: {}", e));
            Output::info("Is the companion server running? Start it with 'tolk serve'.");
        }
    }
}

fn render(update: &UiUpdate, settings: &Settings) {
    match update {
        UiUpdate::Item(item) => {
            let timestamp = settings
                .commentary
                .show_timestamps
                .then(|| item.at.format("%H:%M:%S").to_string());
            Output::commentary(kind_tag(&item.kind), timestamp.as_deref(), &item.text);
            if let Some(payload) = &item.payload {
                if let Some(title) = &payload.title {
                    Output::kv("Title", title);
                }
                if let Some(highlight) = &payload.highlight {
                    if let Some(value) = &highlight.value {
                        Output::kv(highlight.label.as_deref().unwrap_or("Highlight"), value);
                    }
                }
                if let Some(comparison) = &payload.comparison {
                    Output::kv(
                        "Comparison",
                        &format!(
                            "{:.1} vs record {:.1} ({})",
                            comparison.current,
                            comparison.record,
                            comparison.note.as_deref().unwrap_or("")
                        ),
                    );
                }
            }
        }
        UiUpdate::State(state) => Output::transient(&format!("state: {}", state_tag(*state))),
        UiUpdate::Processing(true) => Output::transient("thinking..."),
        UiUpdate::Processing(false) => {}
        UiUpdate::Interim(text) => {
            if !text.is_empty() {
                Output::transient(&format!("... {}", text));
            }
        }
        UiUpdate::EventMetadata(metadata) => {
            if let Some(probability) = metadata.win_probability {
                let change = metadata
                    .probability_change
                    .map(|c| format!(" ({:+.1})", c))
                    .unwrap_or_default();
                Output::kv("Win probability", &format!("{:.1}%{}", probability, change));
            }
            if let Some(score) = metadata.technical_score {
                Output::kv("Technical score", &format!("{:.1}", score));
            }
            if let Some(warning) = &metadata.risk_warning {
                Output::warning(&format!("{}: {}", warning.title, warning.description));
            }
        }
    }
}

fn kind_tag(kind: &CommentaryKind) -> &'static str {
    match kind {
        CommentaryKind::Status => "status",
        CommentaryKind::Analysis => "analysis",
        CommentaryKind::Narration => "narration",
        CommentaryKind::UserQuestion => "you",
        CommentaryKind::Profile => "profile",
        CommentaryKind::LiveDictation => "dictation",
        CommentaryKind::Error => "error",
    }
}

fn state_tag(state: CoordinatorState) -> &'static str {
    match state {
        CoordinatorState::Idle => "idle",
        CoordinatorState::Ready => "ready",
        CoordinatorState::AwaitingAnswer => "awaiting answer",
        CoordinatorState::Narrating => "narrating",
    }
}
