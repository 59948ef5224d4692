//! Audio data types, codecs, and analysis.
//!
//! # Data Types
//! - [`AudioSample`] - Trait for device sample types (i16, f32, etc.)
//! - [`frame::AudioBuffer`] - A buffer of audio samples (raw PCM data)
//! - [`frame::AudioFrame`] - One fixed-size outbound microphone frame
//!
//! # Codec
//! - [`pcm`] - 16-bit little-endian PCM wire format
//! - [`resample`] - Device-rate to wire-rate conversion
//!
//! # Buffers
//! - [`buffers::FrameBatcher`] - Cuts the capture signal into fixed frames
//!
//! # Analysis
//! - [`analyser`] - Spectrum analysis over a tapped signal path
//! - [`meter::VolumeMeter`] - Normalized loudness of capture and playback

pub mod analyser;
pub mod buffers;
pub mod frame;
pub mod meter;
pub mod pcm;
pub mod resample;
pub mod sample;

pub use analyser::{AnalyserTap, SpectrumAnalyser};
pub use buffers::FrameBatcher;
pub use meter::VolumeMeter;
pub use pcm::{DecodedAudio, PcmEncoder, WireChunk};
pub use resample::{PlaybackResampler, StreamResampler};
pub use sample::AudioSample;
