//! Companion HTTP/WebSocket server.
//!
//! Serves the REST endpoints the client asks questions over, plus the
//! `/ws/events` and `/ws/transcript` sockets that carry push events and live
//! transcript entries. All state is in memory for the lifetime of the process.

pub mod hub;
pub mod youtube;

use crate::answer::{AnswerEngine, ChatAnswerer};
use crate::channel::protocol::{
    AudioResponse, CommentaryPush, Empty, InboundEvent, LiveTranscriptMessage, OutboundEvent,
    PauseRequest, QuestionResponse, RemoteError, TranscriptUpdate, VideoLoadRequest,
    VideoLoadResponse,
};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;
use crate::session::EventMetadata;
use crate::transcript::{TranscriptEntry, TranscriptStore};
use crate::tts::{ElevenLabsTts, TtsEngine};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use hub::EventHub;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

/// Shared application state.
pub struct AppState {
    settings: Settings,
    store: TranscriptStore,
    answerer: Arc<dyn AnswerEngine>,
    tts: Arc<dyn TtsEngine>,
    hub: EventHub,
    http: reqwest::Client,
    /// Last reported playback position per video.
    playback: Mutex<HashMap<String, f64>>,
}

/// Run the companion server.
pub async fn run_server(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let answerer = Arc::new(ChatAnswerer::new(
        &settings.answer.model,
        settings.answer.temperature,
    ));
    let tts = Arc::new(ElevenLabsTts::new(&settings.tts)?);

    let state = Arc::new(AppState {
        store: TranscriptStore::new(),
        answerer,
        tts,
        hub: EventHub::new(),
        http: reqwest::Client::new(),
        playback: Mutex::new(HashMap::new()),
        settings,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(health))
        .route("/video/load", post(load_video))
        .route("/question", post(ask_question))
        .route("/transcript/{video_id}", get(get_transcript))
        .route("/audio/{audio_id}", get(get_audio))
        .route("/commentary/push", post(push_commentary))
        .route("/event/update", post(push_event_update))
        .route("/ws/events", get(ws_events))
        .route("/ws/transcript", get(ws_transcript))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Tolk Companion Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /");
    Output::kv("Load Video", "POST /video/load");
    Output::kv("Ask", "POST /question");
    Output::kv("Transcript", "GET  /transcript/:video_id");
    Output::kv("Audio", "GET  /audio/:audio_id");
    Output::kv("Push Commentary", "POST /commentary/push");
    Output::kv("Push Event Update", "POST /event/update");
    Output::kv("Events Socket", "WS   /ws/events");
    Output::kv("Transcript Socket", "WS   /ws/transcript");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TranscriptQuery {
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    end_time: Option<f64>,
}

#[derive(serde::Serialize)]
struct TranscriptResponse {
    video_id: String,
    entries: Vec<TranscriptEntry>,
    total_entries: usize,
}

#[derive(serde::Serialize)]
struct PushAck {
    status: &'static str,
    clients: usize,
}

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "tolk companion server" }))
}

async fn load_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VideoLoadRequest>,
) -> impl IntoResponse {
    let Some(video_id) = youtube::extract_video_id(&req.url) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid YouTube URL. Please provide a valid video or livestream URL.",
        );
    };

    let title = match youtube::fetch_metadata(&state.http, &video_id).await {
        Ok(metadata) => {
            let title = metadata.title.clone();
            state.store.set_metadata(&video_id, metadata);
            title
        }
        Err(e) => {
            warn!("Metadata fetch failed for {}: {}", video_id, e);
            "Unknown".to_string()
        }
    };

    // Captions only exist here if a transcript was stored earlier, for
    // example over the live transcript socket. No stored transcript is
    // treated as a livestream.
    let segments = state
        .store
        .full_transcript(&video_id)
        .map(|t| t.len())
        .unwrap_or(0);
    let has_captions = segments > 0;
    let is_live = !has_captions;

    Json(VideoLoadResponse {
        video_id,
        title,
        is_live,
        has_captions,
        message: load_message(has_captions, is_live, segments),
    })
    .into_response()
}

fn load_message(has_captions: bool, is_live: bool, segments: usize) -> String {
    if has_captions {
        format!("Loaded video with {} transcript segments.", segments)
    } else if is_live {
        "Live stream detected. Transcript will be generated in real-time.".to_string()
    } else {
        "No captions available. Using video title and description for context.".to_string()
    }
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<crate::channel::protocol::QuestionRequest>,
) -> impl IntoResponse {
    match answer_pipeline(&state, &req.question, &req.video_id, req.playback_time).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Shared question pipeline for the REST endpoint and the events socket:
/// context window, answer generation, then optional speech synthesis.
async fn answer_pipeline(
    state: &AppState,
    question: &str,
    video_id: &str,
    playback_time: f64,
) -> Result<QuestionResponse> {
    let window_seconds = state.settings.transcript.window_seconds;
    let context = state.store.context_text(video_id, playback_time, window_seconds);
    let transcript_context = state.store.window(video_id, playback_time, window_seconds);

    let answer = state.answerer.answer(question, &context).await?;

    let audio_id = state.tts.synthesize(&answer).await;
    let audio_base64 = audio_id.as_deref().and_then(|id| state.tts.audio_base64(id));
    let audio_url = audio_id.map(|id| format!("/audio/{}", id));

    Ok(QuestionResponse {
        answer,
        audio_url,
        audio_base64,
        transcript_context,
    })
}

async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    Query(range): Query<TranscriptQuery>,
) -> impl IntoResponse {
    let Some(mut entries) = state.store.full_transcript(&video_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "Transcript not found. Please load the video first.",
        );
    };

    if let Some(end_time) = range.end_time {
        entries.retain(|e| e.start >= range.start_time && e.start <= end_time);
    }

    Json(TranscriptResponse {
        video_id,
        total_entries: entries.len(),
        entries,
    })
    .into_response()
}

async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(audio_id): Path<String>,
) -> impl IntoResponse {
    let Some(audio) = state.tts.audio(&audio_id) else {
        return error_response(StatusCode::NOT_FOUND, "Audio not found or expired.");
    };

    (
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename={}.mp3", audio_id),
            ),
        ],
        audio,
    )
        .into_response()
}

async fn push_commentary(
    State(state): State<Arc<AppState>>,
    Json(card): Json<CommentaryPush>,
) -> impl IntoResponse {
    let clients = state.hub.connection_count();
    state.hub.broadcast(&InboundEvent::PushCommentary(card));
    Json(PushAck {
        status: "pushed",
        clients,
    })
}

async fn push_event_update(
    State(state): State<Arc<AppState>>,
    Json(update): Json<EventMetadata>,
) -> impl IntoResponse {
    let clients = state.hub.connection_count();
    state.hub.broadcast(&InboundEvent::PushEventUpdate(update));
    Json(PushAck {
        status: "pushed",
        clients,
    })
}

// === WebSocket Handlers ===

async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_socket(socket, state))
}

async fn handle_events_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();
    let mut pushes = state.hub.subscribe();

    // One task owns the sink: direct replies and hub broadcasts both flow
    // through it.
    let writer = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(text) => text,
                    None => break,
                },
                push = pushes.recv() => match push {
                    Ok(text) => text,
                    // A slow client skips missed pushes but keeps the socket.
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Events client lagged, skipped {} pushes", missed);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let event: OutboundEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                debug!("Ignoring unrecognized events message: {}", e);
                continue;
            }
        };

        match event {
            OutboundEvent::VoiceDetected(_) => {
                // User started speaking, tell the client to pause playback.
                reply(
                    &reply_tx,
                    &InboundEvent::PauseVideo(PauseRequest {
                        reason: Some("voice_input".to_string()),
                    }),
                );
            }
            OutboundEvent::PlaybackUpdate(update) => {
                state
                    .playback
                    .lock()
                    .unwrap()
                    .insert(update.video_id, update.playback_time);
            }
            OutboundEvent::Question(q) => {
                reply(&reply_tx, &InboundEvent::ProcessingStart(Empty {}));

                match answer_pipeline(&state, &q.question, &q.video_id, q.playback_time).await {
                    Ok(response) => reply(
                        &reply_tx,
                        &InboundEvent::AudioResponse(AudioResponse {
                            answer: Some(response.answer),
                            audio_base64: response.audio_base64,
                            audio_url: response.audio_url,
                        }),
                    ),
                    Err(e) => reply(
                        &reply_tx,
                        &InboundEvent::Error(RemoteError {
                            message: e.to_string(),
                        }),
                    ),
                }

                reply(&reply_tx, &InboundEvent::ProcessingComplete(Empty {}));
            }
        }
    }

    writer.abort();
}

fn reply(tx: &mpsc::UnboundedSender<String>, event: &InboundEvent) {
    match serde_json::to_string(event) {
        Ok(text) => {
            let _ = tx.send(text);
        }
        Err(e) => warn!("Failed to serialize reply: {}", e),
    }
}

async fn ws_transcript(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_transcript_socket(socket, state))
}

async fn handle_transcript_socket(mut socket: WebSocket, state: Arc<AppState>) {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let submission: LiveTranscriptMessage = match serde_json::from_str(&text) {
            Ok(submission) => submission,
            Err(e) => {
                debug!("Ignoring unrecognized transcript message: {}", e);
                continue;
            }
        };
        if submission.message_type != LiveTranscriptMessage::TYPE {
            continue;
        }

        state
            .store
            .add_live_entry(&submission.video_id, submission.entry.clone());
        state.hub.broadcast(&InboundEvent::TranscriptUpdate(TranscriptUpdate {
            entry: submission.entry,
        }));
    }
}
