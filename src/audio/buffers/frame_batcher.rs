//! Cuts a continuous capture signal into fixed-size frames.

use crate::audio::frame::{AudioFrame, CAPTURE_FRAME_SAMPLES, CaptureBlock};
use crate::pipeline::Node;

/// Accumulates incoming blocks and emits [`AudioFrame`]s of
/// [`CAPTURE_FRAME_SAMPLES`] samples.
///
/// Device callbacks deliver blocks of arbitrary length; the remote service
/// gets frames at a fixed cadence. Leftover samples carry over to the next
/// block, and a single large block may emit several frames.
#[derive(Default)]
pub struct FrameBatcher {
    buffer: Vec<f32>,
}

impl FrameBatcher {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(CAPTURE_FRAME_SAMPLES * 2),
        }
    }
}

impl Node for FrameBatcher {
    type Input = CaptureBlock;
    type Output = AudioFrame;

    fn process(&mut self, input: CaptureBlock, emit: &mut dyn FnMut(AudioFrame)) {
        self.buffer.extend(input.into_inner());

        while self.buffer.len() >= CAPTURE_FRAME_SAMPLES {
            let mut samples = Box::new([0.0; CAPTURE_FRAME_SAMPLES]);
            samples.copy_from_slice(&self.buffer[..CAPTURE_FRAME_SAMPLES]);
            self.buffer.drain(..CAPTURE_FRAME_SAMPLES);
            emit(AudioFrame::new(samples));
        }
    }
}
