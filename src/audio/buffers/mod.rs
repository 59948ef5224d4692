//! Buffering stages for the capture path.
//!
//! - [`FrameBatcher`] - cuts the microphone signal into fixed-size frames

pub mod frame_batcher;

pub use frame_batcher::FrameBatcher;
