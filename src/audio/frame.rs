use anyhow::Result;

/// Sample rate the remote service expects for microphone audio.
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Sample rate of synthesized replies.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Samples per outbound frame (4096 at 16 kHz, about 256 ms).
pub const CAPTURE_FRAME_SAMPLES: usize = 4096;

/// A type-safe audio buffer with compile-time channel count and sample rate.
///
/// Samples are interleaved when `CHANNELS > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32> {
    data: Vec<Sample>,
}

/// Mono microphone signal after device conversion, before framing.
pub type CaptureBlock = AudioBuffer<f32, 1, CAPTURE_SAMPLE_RATE>;

impl<Sample, const CHANNELS: usize, const SAMPLE_RATE: u32>
    AudioBuffer<Sample, CHANNELS, SAMPLE_RATE>
{
    /// Create a new audio buffer from raw samples.
    ///
    /// Returns an error if the data length is not a multiple of the channel count.
    pub fn new(data: Vec<Sample>) -> Result<Self> {
        if !data.is_empty() && data.len() % CHANNELS != 0 {
            anyhow::bail!(
                "Data length {} must be a multiple of channels {}",
                data.len(),
                CHANNELS
            );
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &[Sample] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<Sample> {
        self.data
    }
}

/// One outbound frame: exactly [`CAPTURE_FRAME_SAMPLES`] mono samples at
/// [`CAPTURE_SAMPLE_RATE`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Box<[f32; CAPTURE_FRAME_SAMPLES]>,
}

impl AudioFrame {
    pub fn new(samples: Box<[f32; CAPTURE_FRAME_SAMPLES]>) -> Self {
        Self { samples }
    }

    pub fn data(&self) -> &[f32] {
        &self.samples[..]
    }

    pub const fn sample_rate(&self) -> u32 {
        CAPTURE_SAMPLE_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_fixed_size_at_capture_rate() {
        let frame = AudioFrame::new(Box::new([0.5; CAPTURE_FRAME_SAMPLES]));
        assert_eq!(frame.data().len(), 4096);
        assert_eq!(frame.sample_rate(), 16000);
        assert!(frame.data().iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_multichannel_length_validation() {
        assert!(AudioBuffer::<f32, 2, 48000>::new(vec![0.0; 4]).is_ok());
        assert!(AudioBuffer::<f32, 2, 48000>::new(vec![0.0; 3]).is_err());
        let stereo = AudioBuffer::<f32, 2, 48000>::new(vec![0.0; 960]).unwrap();
        assert_eq!(stereo.data().len(), 960);
    }
}
