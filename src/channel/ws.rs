//! WebSocket + REST channel implementation.

use super::{Handler, HandlerId, RealtimeChannel, Subscriptions};
use crate::channel::protocol::{InboundEvent, InboundKind, OutboundEvent, QuestionRequest, QuestionResponse};
use crate::config::ChannelSettings;
use crate::error::{Result, TolkError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Live connection state: the writer queue plus the tasks pumping the socket.
struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    reader: tokio::task::JoinHandle<()>,
    writer: tokio::task::JoinHandle<()>,
}

/// Channel implementation speaking the companion server protocol.
///
/// Push events travel over the `/ws/events` WebSocket; `ask_question` uses
/// the REST `/question` endpoint so a hung question never blocks the push
/// stream.
pub struct WsChannel {
    api_base_url: String,
    events_ws_url: String,
    http: reqwest::Client,
    subs: Arc<Subscriptions>,
    conn: Mutex<Option<Connection>>,
}

impl WsChannel {
    pub fn new(settings: &ChannelSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()?;

        Ok(Self {
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            events_ws_url: settings.events_ws_url.clone(),
            http,
            subs: Arc::new(Subscriptions::new()),
            conn: Mutex::new(None),
        })
    }
}

#[async_trait]
impl RealtimeChannel for WsChannel {
    async fn connect(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            debug!("Channel already connected");
            return Ok(());
        }

        let (stream, _response) = connect_async(&self.events_ws_url).await?;
        info!("Connected to {}", self.events_ws_url);
        let (mut write, mut read) = stream.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    warn!("WebSocket send failed: {}", e);
                    break;
                }
            }
        });

        let subs = Arc::clone(&self.subs);
        let reader = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<InboundEvent>(text.as_str()) {
                        Ok(event) => subs.dispatch(&event),
                        Err(e) => warn!("Unrecognized push message: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        info!("Push connection closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Push connection error: {}", e);
                        break;
                    }
                }
            }
        });

        *guard = Some(Connection {
            outbound,
            reader,
            writer,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.take() {
            let _ = conn.outbound.send(Message::Close(None));
            conn.writer.abort();
            conn.reader.abort();
            info!("Disconnected from push channel");
        }
        Ok(())
    }

    async fn send(&self, event: OutboundEvent) -> Result<()> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| TolkError::Channel("not connected".to_string()))?;
        let json = serde_json::to_string(&event)?;
        conn.outbound
            .send(Message::text(json))
            .map_err(|_| TolkError::Channel("push connection is closing".to_string()))?;
        Ok(())
    }

    async fn ask_question(&self, request: QuestionRequest) -> Result<QuestionResponse> {
        let url = format!("{}/question", self.api_base_url);
        debug!("POST {} ({})", url, request.question);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| TolkError::Question(e.to_string()))?;

        response
            .json::<QuestionResponse>()
            .await
            .map_err(|e| TolkError::MalformedResponse(e.to_string()))
    }

    fn on(&self, kind: InboundKind, handler: Handler) -> HandlerId {
        self.subs.on(kind, handler)
    }

    fn off(&self, kind: InboundKind, id: HandlerId) {
        self.subs.off(kind, id)
    }
}
