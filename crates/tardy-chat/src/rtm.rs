//! Real-time messaging event source over `tokio-tungstenite`.
//!
//! Each [`EventSource::connect`] call asks the Web API for a fresh websocket
//! URL, opens it and yields decoded frames until the socket closes. The
//! stream also sends keepalive pings and answers transport pings. It never
//! reconnects on its own; the caller owns the retry policy.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::errors::ChatError;
use crate::event::{ChatEvent, EventStream, decode_frame};
use crate::platform::EventSource;
use crate::slack::SlackClient;

/// Default interval between keepalive pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn transport_error(message: impl ToString) -> ChatEvent {
    ChatEvent::Error {
        code: 0,
        message: message.to_string(),
    }
}

/// What woke the read loop.
enum Step {
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
    Ping,
}

/// RTM websocket event source.
#[derive(Debug)]
pub struct RtmEventSource {
    client: Arc<SlackClient>,
    ping_interval: Duration,
}

impl RtmEventSource {
    /// Source that connects through `client`.
    pub fn new(client: Arc<SlackClient>) -> Self {
        Self {
            client,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }

    /// Override the keepalive interval.
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }
}

#[async_trait]
impl EventSource for RtmEventSource {
    async fn connect(&self) -> EventStream {
        let client = Arc::clone(&self.client);
        let ping_interval = self.ping_interval;

        Box::pin(async_stream::stream! {
            let session = match client.rtm_connect().await {
                Ok(session) => session,
                Err(ChatError::InvalidAuth(code)) => {
                    warn!(%code, "rtm.connect rejected token");
                    yield ChatEvent::InvalidAuth;
                    return;
                }
                Err(e) => {
                    yield transport_error(e);
                    return;
                }
            };

            let mut ws = match connect_async(session.url.as_str()).await {
                Ok((ws, _)) => ws,
                Err(e) => {
                    yield transport_error(ChatError::WebSocket(e.to_string()));
                    return;
                }
            };
            info!(self_id = %session.self_id, "rtm connected");
            yield ChatEvent::Connected;

            let mut ticker = tokio::time::interval(ping_interval);
            // first tick fires immediately
            let _ = ticker.tick().await;
            let mut ping_id: u64 = 0;

            loop {
                let step = tokio::select! {
                    frame = ws.next() => Step::Frame(frame),
                    _ = ticker.tick() => Step::Ping,
                };

                match step {
                    Step::Frame(Some(Ok(Message::Text(text)))) => {
                        if let Some(event) = decode_frame(text.as_str(), now_ms()) {
                            yield event;
                        }
                    }
                    Step::Frame(Some(Ok(Message::Ping(data)))) => {
                        if let Err(e) = ws.send(Message::Pong(data)).await {
                            yield transport_error(ChatError::WebSocket(e.to_string()));
                            return;
                        }
                    }
                    Step::Frame(Some(Ok(Message::Close(reason)))) => {
                        debug!(?reason, "rtm socket closed by server");
                        return;
                    }
                    Step::Frame(Some(Ok(_))) => {}
                    Step::Frame(Some(Err(e))) => {
                        yield transport_error(ChatError::WebSocket(e.to_string()));
                        return;
                    }
                    Step::Frame(None) => {
                        debug!("rtm socket ended");
                        return;
                    }
                    Step::Ping => {
                        ping_id += 1;
                        let frame = json!({ "id": ping_id, "type": "ping", "time": now_ms() });
                        if let Err(e) = ws.send(Message::Text(frame.to_string().into())).await {
                            yield transport_error(ChatError::WebSocket(e.to_string()));
                            return;
                        }
                    }
                }
            }
        })
    }
}
