//! One realtime conversation with the remote speech service.
//!
//! - [`LiveConfig`] - credential, model, voice, and instruction
//! - [`Transport`] / [`TransportHandle`] - the connection seam and its events
//! - [`protocol`] - Gemini Live message shapes
//! - [`SessionDriver`] - lifecycle state machine that owns every session resource
//! - [`LiveState`] - status, error message, and volume for observers
//! - [`LiveClient`] - start/stop handle the UI holds

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod state;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::LiveClient;
pub use config::LiveConfig;
pub use lifecycle::{Command, Event, SessionDriver};
pub use state::{LiveSnapshot, LiveState, LiveStatus};
pub use transport::{ClientMessage, ServerEvent, Transport, TransportHandle};
