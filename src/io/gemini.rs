//! Gemini Live transport over a TLS WebSocket.
//!
//! One tokio task owns the socket and multiplexes:
//! - outbound [`ClientMessage`]s from the session (dropped until `setupComplete`)
//! - inbound JSON messages, translated into [`ServerEvent`]s

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{LiveError, LiveResult};
use crate::session::config::LiveConfig;
use crate::session::protocol::{RealtimeInputMessage, ServerMessage, SetupMessage};
use crate::session::transport::{ClientMessage, ServerEvent, Transport, TransportHandle};

#[derive(Debug, Default, Clone, Copy)]
pub struct GeminiTransport;

impl GeminiTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Endpoint URL with the credential as the `key` query parameter.
pub fn session_url(config: &LiveConfig) -> LiveResult<Url> {
    let key = config.credential()?;
    let mut url = Url::parse(&config.endpoint)
        .map_err(|e| LiveError::TransportError(format!("invalid endpoint: {e}")))?;
    url.query_pairs_mut().append_pair("key", key);
    Ok(url)
}

impl Transport for GeminiTransport {
    fn connect(&self, config: &LiveConfig) -> LiveResult<TransportHandle> {
        let url = session_url(config)?;
        let setup = to_text(&SetupMessage::from_config(config))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            if let Err(e) = run_connection(url, setup, outbound_rx, &events_tx).await {
                error!("Live connection failed: {e}");
                let _ = events_tx.send(ServerEvent::Error(e.to_string()));
            }
        });

        Ok(TransportHandle::new(outbound_tx, events_rx))
    }
}

fn to_text<T: Serialize>(message: &T) -> LiveResult<String> {
    serde_json::to_string(message)
        .map_err(|e| LiveError::TransportError(format!("failed to serialize message: {e}")))
}

async fn run_connection(
    url: Url,
    setup: String,
    mut outbound: UnboundedReceiver<ClientMessage>,
    events: &UnboundedSender<ServerEvent>,
) -> LiveResult<()> {
    let transport_err = |e: tokio_tungstenite::tungstenite::Error| {
        LiveError::TransportError(e.to_string())
    };

    let (ws_stream, _) = connect_async(url.as_str()).await.map_err(transport_err)?;
    info!("Live socket connected to {}", url.host_str().unwrap_or("service"));

    let (mut writer, mut reader) = ws_stream.split();
    writer
        .send(Message::text(setup))
        .await
        .map_err(transport_err)?;

    let mut opened = false;
    loop {
        tokio::select! {
            message = outbound.recv() => match route_outbound(message, opened)? {
                Outbound::Send(text) => {
                    writer.send(Message::text(text)).await.map_err(transport_err)?;
                }
                Outbound::Skip => {}
                Outbound::Close => {
                    debug!("Closing live socket");
                    let _ = writer.send(Message::Close(None)).await;
                    return Ok(());
                }
            },
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    opened |= dispatch(text.as_str(), events);
                }
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => opened |= dispatch(text, events),
                    Err(_) => warn!("Ignoring non-UTF-8 binary message"),
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("Live socket closed by server: {frame:?}");
                    let _ = events.send(ServerEvent::Closed);
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(transport_err(e)),
                None => {
                    let _ = events.send(ServerEvent::Closed);
                    return Ok(());
                }
            },
        }
    }
}

/// What the socket task does with one message from the session.
#[derive(Debug, PartialEq, Eq)]
enum Outbound {
    Send(String),
    Skip,
    Close,
}

/// Media is held back until the handshake completes; a closed queue closes the socket.
fn route_outbound(message: Option<ClientMessage>, opened: bool) -> LiveResult<Outbound> {
    match message {
        Some(ClientMessage::Media(chunk)) if !opened => {
            warn!(
                "Dropping {} byte frame sent before setup completed",
                chunk.bytes().len()
            );
            Ok(Outbound::Skip)
        }
        Some(ClientMessage::Media(chunk)) => {
            to_text(&RealtimeInputMessage::from_chunk(&chunk)).map(Outbound::Send)
        }
        Some(ClientMessage::Close) | None => Ok(Outbound::Close),
    }
}

/// Forward every event in one server message. Returns whether it completed the handshake.
fn dispatch(text: &str, events: &UnboundedSender<ServerEvent>) -> bool {
    let message = match ServerMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring unparseable server message: {e}");
            return false;
        }
    };

    let mut opened = false;
    for event in message.into_events() {
        opened |= event == ServerEvent::Opened;
        let _ = events.send(event);
    }
    opened
}
