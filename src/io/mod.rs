//! Hardware and network I/O.
//!
//! Concrete implementations of the session's outside-world seams:
//!
//! - [`CpalDevices`] - Microphone capture and speaker playback via cpal
//! - [`GeminiTransport`] - Gemini Live over a WebSocket

pub mod audio;
pub mod gemini;

pub use audio::{ActiveStream, AudioDevices, CpalDevices};
pub use gemini::GeminiTransport;
