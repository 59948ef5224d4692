//! 16-bit little-endian PCM wire codec.
//!
//! Outbound frames are encoded with [`encode`]; inbound reply segments are
//! decoded with [`decode`]. Both are pure functions; [`PcmEncoder`] wraps
//! [`encode`] as a pipeline [`Node`].

use crate::error::{LiveError, LiveResult};
use crate::pipeline::Node;

use super::frame::AudioFrame;

/// Byte-encoded audio exchanged with the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireChunk {
    bytes: Vec<u8>,
    sample_rate: u32,
}

impl WireChunk {
    pub fn new(bytes: Vec<u8>, sample_rate: u32) -> Self {
        Self { bytes, sample_rate }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type announced to the service for this chunk.
    pub fn mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.sample_rate)
    }
}

/// Decoded PCM with its format. Samples are stored planar, one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Frames per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Collapses all channels into one by averaging.
    pub fn into_mono(mut self) -> Vec<f32> {
        if self.channels.len() <= 1 {
            return self.channels.pop().unwrap_or_default();
        }
        let count = self.channels.len() as f32;
        (0..self.frames())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() / count)
            .collect()
    }
}

/// Encode float samples as 16-bit signed little-endian bytes.
///
/// Negative samples scale by 0x8000 and non-negative ones by 0x7FFF, so both
/// ends of [-1, 1] map onto the full i16 range. Non-negative products are
/// rounded up, which keeps every sample within one step of its [`decode`]d value.
pub fn encode(frame: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frame.len() * 2);
    for &sample in frame {
        let s = sample.clamp(-1.0, 1.0);
        let value = if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0).ceil() as i16
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Inverse of [`encode`]: reinterpret `chunk` as interleaved i16 LE samples
/// and rescale each by 1/32768.
pub fn decode(chunk: &[u8], sample_rate: u32, channel_count: usize) -> LiveResult<DecodedAudio> {
    if chunk.len() % 2 != 0 {
        return Err(LiveError::InvalidPayload(format!(
            "PCM16 payload has odd length {}",
            chunk.len()
        )));
    }
    if channel_count == 0 {
        return Err(LiveError::InvalidPayload("channel count is zero".into()));
    }

    let total_samples = chunk.len() / 2;
    if total_samples % channel_count != 0 {
        return Err(LiveError::InvalidPayload(format!(
            "{total_samples} samples do not divide into {channel_count} channels"
        )));
    }

    let frames = total_samples / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for (i, pair) in chunk.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([pair[0], pair[1]]);
        channels[i % channel_count].push(value as f32 / 32768.0);
    }

    Ok(DecodedAudio {
        sample_rate,
        channels,
    })
}

/// Encodes each outbound [`AudioFrame`] into a [`WireChunk`].
#[derive(Debug, Default)]
pub struct PcmEncoder;

impl PcmEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Node for PcmEncoder {
    type Input = AudioFrame;
    type Output = WireChunk;

    fn process(&mut self, input: AudioFrame, emit: &mut dyn FnMut(WireChunk)) {
        emit(WireChunk::new(encode(input.data()), input.sample_rate()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 32768.0;

    #[test]
    fn test_encode_empty_frame() {
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn test_encode_length_and_extremes() {
        let bytes = encode(&[-1.0, 0.0, 1.0]);
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MIN);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), i16::MAX);
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let bytes = encode(&[-3.0, 2.5]);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), i16::MIN);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), i16::MAX);
    }

    #[test]
    fn test_decode_odd_length_is_invalid() {
        let err = decode(&[0, 1, 2], 24000, 1).unwrap_err();
        assert!(matches!(err, LiveError::InvalidPayload(_)));
    }

    #[test]
    fn test_decode_rejects_partial_multichannel_frame() {
        assert!(decode(&[0; 6], 24000, 2).is_err());
        assert!(decode(&[0; 4], 24000, 0).is_err());
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let input: Vec<f32> = (0..2000)
            .map(|i| ((i as f32 * 0.013).sin() * 0.9) + if i % 7 == 0 { 0.1 } else { -0.05 })
            .map(|s| s.clamp(-1.0, 1.0))
            .chain([-1.0, 1.0, 0.0, -STEP, STEP * 0.5])
            .collect();

        let decoded = decode(&encode(&input), 16000, 1).unwrap();
        assert_eq!(decoded.frames(), input.len());
        for (orig, back) in input.iter().zip(&decoded.channels[0]) {
            assert!(
                (orig - back).abs() <= STEP,
                "sample {orig} decoded as {back}"
            );
        }
    }

    #[test]
    fn test_decode_deinterleaves_channels() {
        let mut bytes = Vec::new();
        for v in [16384i16, -16384, 8192, -8192] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let decoded = decode(&bytes, 24000, 2).unwrap();
        assert_eq!(decoded.channels[0], vec![0.5, 0.25]);
        assert_eq!(decoded.channels[1], vec![-0.5, -0.25]);
        assert_eq!(decoded.frames(), 2);
        assert_eq!(decoded.into_mono(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_decoded_duration() {
        let decoded = decode(&vec![0u8; 4800 * 2], 24000, 1).unwrap();
        assert!((decoded.duration_secs() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_encoder_node_tags_capture_rate() {
        let mut encoder = PcmEncoder::new();
        let frame = AudioFrame::new(Box::new([0.25; 4096]));
        let mut out = Vec::new();
        encoder.process(frame, &mut |chunk| out.push(chunk));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes().len(), 8192);
        assert_eq!(out[0].mime_type(), "audio/pcm;rate=16000");
    }
}
