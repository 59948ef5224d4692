use std::fmt::Debug;

/// A device sample format the capture path can convert to normalized `f32`.
///
/// Implemented for every format [`crate::io::audio`] accepts from cpal.
pub trait AudioSample: Copy + Send + Sync + Debug + 'static {
    fn silence() -> Self;

    fn to_f32_normalized(self) -> f32;

    fn from_f32_normalized(value: f32) -> Self;
}

impl AudioSample for f32 {
    fn silence() -> Self {
        0.0
    }

    fn to_f32_normalized(self) -> f32 {
        self
    }

    fn from_f32_normalized(value: f32) -> Self {
        value.clamp(-1.0, 1.0)
    }
}

impl AudioSample for i16 {
    fn silence() -> Self {
        0
    }

    fn to_f32_normalized(self) -> f32 {
        self as f32 / 32768.0
    }

    fn from_f32_normalized(value: f32) -> Self {
        let v = value.clamp(-1.0, 1.0);
        if v < 0.0 {
            (v * 32768.0) as i16
        } else {
            (v * 32767.0) as i16
        }
    }
}

impl AudioSample for i32 {
    fn silence() -> Self {
        0
    }

    fn to_f32_normalized(self) -> f32 {
        (self as f64 / 2147483648.0) as f32
    }

    fn from_f32_normalized(value: f32) -> Self {
        (value.clamp(-1.0, 1.0) as f64 * i32::MAX as f64) as i32
    }
}

impl AudioSample for u16 {
    fn silence() -> Self {
        32768
    }

    fn to_f32_normalized(self) -> f32 {
        (self as f32 - 32768.0) / 32768.0
    }

    fn from_f32_normalized(value: f32) -> Self {
        ((value.clamp(-1.0, 1.0) * 32767.0) + 32768.0) as u16
    }
}

/// Averages interleaved frames down to a single channel.
pub fn downmix_to_mono<Sample: AudioSample>(data: &[Sample], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.iter().map(|s| s.to_f32_normalized()).collect();
    }
    data.chunks_exact(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|s| s.to_f32_normalized()).sum();
            sum / channels as f32
        })
        .collect()
}
