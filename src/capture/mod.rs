//! Microphone processing chain.
//!
//! The device callback pushes 16 kHz mono [`CaptureBlock`]s into the sink
//! returned by [`capture_chain`]:
//!
//! ```text
//! TapNode -> FrameBatcher(4096) -> PcmEncoder -> FrameSink
//! ```
//!
//! Encoded frames leave through an unbounded channel read by the session
//! loop, so the audio thread never waits on the network.

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::audio::frame::CaptureBlock;
use crate::audio::{AnalyserTap, FrameBatcher, PcmEncoder, WireChunk};
use crate::pipeline::{Node, Sink};

/// Sink the microphone stream feeds.
pub type CaptureSink = Box<dyn Sink<Input = CaptureBlock>>;

/// Copies the raw signal into an analyser tap and passes it on unchanged.
pub struct TapNode {
    tap: AnalyserTap,
}

impl TapNode {
    pub fn new(tap: AnalyserTap) -> Self {
        Self { tap }
    }
}

impl Node for TapNode {
    type Input = CaptureBlock;
    type Output = CaptureBlock;

    fn process(&mut self, input: CaptureBlock, emit: &mut dyn FnMut(CaptureBlock)) {
        self.tap.write(input.data());
        emit(input);
    }
}

/// Hands encoded frames to the session loop.
pub struct FrameSink {
    frames: UnboundedSender<WireChunk>,
}

impl FrameSink {
    pub fn new(frames: UnboundedSender<WireChunk>) -> Self {
        Self { frames }
    }
}

impl Sink for FrameSink {
    type Input = WireChunk;

    fn push(&mut self, input: WireChunk) {
        if self.frames.send(input).is_err() {
            trace!("Capture frame dropped, session loop is gone");
        }
    }
}

/// Build the full capture chain ending in `frames`.
pub fn capture_chain(frames: UnboundedSender<WireChunk>, tap: AnalyserTap) -> CaptureSink {
    Box::new(
        FrameSink::new(frames)
            .get_data_from(PcmEncoder::new())
            .get_data_from(FrameBatcher::new())
            .get_data_from(TapNode::new(tap)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::CAPTURE_FRAME_SAMPLES;
    use crate::audio::pcm;
    use tokio::sync::mpsc;

    fn block(len: usize, value: f32) -> CaptureBlock {
        CaptureBlock::new(vec![value; len]).unwrap()
    }

    #[test]
    fn test_chain_emits_encoded_frames_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = capture_chain(tx, AnalyserTap::default());

        for i in 0..8 {
            sink.push(block(1024, i as f32 / 10.0));
        }

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());

        assert_eq!(first.bytes().len(), CAPTURE_FRAME_SAMPLES * 2);
        assert_eq!(first.mime_type(), "audio/pcm;rate=16000");

        let decoded = pcm::decode(second.bytes(), 16000, 1).unwrap();
        assert!((decoded.channels[0][0] - 0.4).abs() < 1e-3);
        assert!((decoded.channels[0][4095] - 0.7).abs() < 1e-3);
    }

    #[test]
    fn test_tap_sees_raw_signal_before_framing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tap = AnalyserTap::new(4);
        let mut sink = capture_chain(tx, tap.clone());

        sink.push(block(4, 0.5));
        assert_eq!(tap.snapshot(), vec![0.5; 4]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = capture_chain(tx, AnalyserTap::default());
        sink.push(block(CAPTURE_FRAME_SAMPLES, 0.1));
    }
}
