//! The seam between a session and the remote speech service.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::audio::WireChunk;
use crate::error::{LiveError, LiveResult};

use super::config::LiveConfig;

/// What a session sends to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Media(WireChunk),
    Close,
}

/// What the service reports back, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Handshake finished; media may flow.
    Opened,
    /// One PCM16 segment of the reply at 24 kHz.
    Audio(Vec<u8>),
    /// The user talked over the reply.
    Interrupted,
    TurnComplete,
    Closed,
    Error(String),
}

/// Opens sessions with a remote service.
///
/// `connect` returns immediately; the handshake completes asynchronously
/// and is reported as [`ServerEvent::Opened`]. Implementations that spawn
/// tasks must be called from within a tokio runtime.
pub trait Transport: Send + Sync {
    fn connect(&self, config: &LiveConfig) -> LiveResult<TransportHandle>;
}

/// One open session: an outbound queue and an inbound event stream.
pub struct TransportHandle {
    outbound: UnboundedSender<ClientMessage>,
    events: UnboundedReceiver<ServerEvent>,
}

impl TransportHandle {
    pub fn new(
        outbound: UnboundedSender<ClientMessage>,
        events: UnboundedReceiver<ServerEvent>,
    ) -> Self {
        Self { outbound, events }
    }

    pub fn send(&self, chunk: WireChunk) -> LiveResult<()> {
        self.outbound
            .send(ClientMessage::Media(chunk))
            .map_err(|_| LiveError::TransportError("session is closed".into()))
    }

    /// Next event; `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    /// Ask the connection to close. Events still in flight are discarded.
    pub fn close(&mut self) {
        if self.outbound.send(ClientMessage::Close).is_err() {
            debug!("Transport already closed");
        }
        self.events.close();
    }
}
