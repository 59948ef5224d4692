//! Sample-rate conversion between device clocks and the wire rates.
//!
//! Devices rarely run at 16 kHz or 24 kHz, so the capture path converts the
//! microphone rate down to [`CAPTURE_SAMPLE_RATE`] and the playback path
//! converts [`PLAYBACK_SAMPLE_RATE`] up to whatever the speaker runs at.
//! Both directions collapse to a plain copy when the rates already match.
//!
//! [`CAPTURE_SAMPLE_RATE`]: super::frame::CAPTURE_SAMPLE_RATE
//! [`PLAYBACK_SAMPLE_RATE`]: super::frame::PLAYBACK_SAMPLE_RATE

use std::collections::VecDeque;

use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};
use tracing::debug;

/// Input frames per resampler pass.
pub const RESAMPLE_CHUNK: usize = 1024;

/// Mono streaming resampler with an internal input queue.
pub struct StreamResampler {
    inner: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32, chunk_size: usize) -> Result<Self> {
        let inner = if from_rate == to_rate {
            None
        } else {
            let resampler =
                FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1)
                    .with_context(|| {
                        format!("Failed to create resampler {from_rate}Hz -> {to_rate}Hz")
                    })?;
            debug!("Created resampler {from_rate}Hz -> {to_rate}Hz");
            Some(resampler)
        };

        Ok(Self {
            inner,
            pending: Vec::new(),
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Input frames the next pass consumes.
    pub fn input_frames_next(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(RESAMPLE_CHUNK, |r| r.input_frames_next())
    }

    /// Queue `input` and return every output sample that is now complete.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(input.to_vec());
        };

        self.pending.extend_from_slice(input);
        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let mut resampled = resampler
                .process(&[&self.pending[..needed]], None)
                .context("Resampler pass failed")?;
            self.pending.drain(..needed);
            if let Some(channel) = resampled.pop() {
                output.extend(channel);
            }
        }
        Ok(output)
    }
}

/// Pulls 24 kHz audio on demand and delivers it at the device rate.
pub struct PlaybackResampler {
    resampler: StreamResampler,
    ready: VecDeque<f32>,
    scratch: Vec<f32>,
}

impl PlaybackResampler {
    pub fn new(source_rate: u32, device_rate: u32) -> Result<Self> {
        Ok(Self {
            resampler: StreamResampler::new(source_rate, device_rate, RESAMPLE_CHUNK / 2)?,
            ready: VecDeque::new(),
            scratch: Vec::new(),
        })
    }

    /// Fill `out` completely, calling `render` for as many source frames as
    /// the conversion needs.
    pub fn fill(&mut self, out: &mut [f32], mut render: impl FnMut(&mut [f32])) -> Result<()> {
        if self.resampler.is_passthrough() {
            render(out);
            return Ok(());
        }

        while self.ready.len() < out.len() {
            self.scratch.clear();
            self.scratch.resize(self.resampler.input_frames_next(), 0.0);
            render(&mut self.scratch);
            let converted = self.resampler.process(&self.scratch)?;
            self.ready.extend(converted);
        }

        let needed = out.len();
        for (slot, sample) in out.iter_mut().zip(self.ready.drain(..needed)) {
            *slot = sample;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_rates_pass_through() {
        let mut resampler = StreamResampler::new(16000, 16000, RESAMPLE_CHUNK).unwrap();
        assert!(resampler.is_passthrough());
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(resampler.process(&input).unwrap(), input);
    }

    #[test]
    fn test_downsampling_ratio() {
        let mut resampler = StreamResampler::new(48000, 16000, RESAMPLE_CHUNK).unwrap();
        assert!(!resampler.is_passthrough());

        let mut total = 0;
        for _ in 0..10 {
            total += resampler.process(&vec![0.0; 4800]).unwrap().len();
        }
        assert!(total <= 16000, "produced {total}");
        assert!(total >= 15000, "produced {total}");
    }

    #[test]
    fn test_short_input_waits_for_full_chunk() {
        let mut resampler = StreamResampler::new(44100, 16000, RESAMPLE_CHUNK).unwrap();
        assert!(resampler.process(&[0.0; 10]).unwrap().is_empty());
        assert!(resampler.process(&[0.0; 10]).unwrap().is_empty());
        assert_eq!(resampler.pending.len(), 20);
    }

    #[test]
    fn test_playback_fill_is_complete() {
        let mut playback = PlaybackResampler::new(24000, 48000).unwrap();
        let mut rendered = 0;
        let mut out = vec![1.0; 4800];
        for _ in 0..3 {
            playback
                .fill(&mut out, |buf| {
                    rendered += buf.len();
                    buf.fill(0.0);
                })
                .unwrap();
            assert_eq!(out.len(), 4800);
        }
        assert!(rendered >= 3 * 2400, "rendered {rendered}");
    }

    #[test]
    fn test_playback_passthrough_renders_directly() {
        let mut playback = PlaybackResampler::new(24000, 24000).unwrap();
        let mut out = vec![0.0; 8];
        playback.fill(&mut out, |buf| buf.fill(0.5)).unwrap();
        assert_eq!(out, vec![0.5; 8]);
    }
}
