//! Gapless scheduling of inbound reply audio.

use tracing::debug;

use crate::audio::frame::PLAYBACK_SAMPLE_RATE;
use crate::audio::pcm;
use crate::error::LiveResult;

use super::timeline::{PlaybackTimeline, UnitId};

/// Where an enqueued chunk landed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledUnit {
    pub id: UnitId,
    pub start_secs: f64,
    pub duration_secs: f64,
}

/// Schedules decoded chunks back to back in arrival order.
///
/// Each chunk starts at `max(cursor, clock)` and pushes the cursor to its
/// own end, so chunks that arrive while their predecessor is still playing
/// follow it without a gap, and chunks that arrive late start right away.
/// Cursor and start times are whole frames on the 24 kHz timeline.
pub struct PlaybackScheduler {
    timeline: PlaybackTimeline,
    cursor: u64,
}

impl PlaybackScheduler {
    pub fn new(timeline: PlaybackTimeline) -> Self {
        let cursor = timeline.clock_frames();
        Self { timeline, cursor }
    }

    pub fn timeline(&self) -> &PlaybackTimeline {
        &self.timeline
    }

    pub fn cursor_frames(&self) -> u64 {
        self.cursor
    }

    pub fn cursor_secs(&self) -> f64 {
        self.timeline.frames_to_secs(self.cursor_frames())
    }

    /// Decode one inbound chunk and schedule it after everything already queued.
    ///
    /// A malformed chunk fails with `InvalidPayload` and leaves the cursor untouched.
    pub fn enqueue(&mut self, chunk: &[u8]) -> LiveResult<ScheduledUnit> {
        let decoded = pcm::decode(chunk, PLAYBACK_SAMPLE_RATE, 1)?;
        let duration_secs = decoded.duration_secs();
        let samples = decoded.into_mono();
        let frames = samples.len() as u64;

        let (id, start) = self.timeline.schedule(samples, self.cursor);
        self.cursor = start + frames;

        let unit = ScheduledUnit {
            id,
            start_secs: self.timeline.frames_to_secs(start),
            duration_secs,
        };
        debug!(
            "Scheduled unit {} at {:.3}s for {:.3}s ({} queued)",
            unit.id,
            unit.start_secs,
            unit.duration_secs,
            self.scheduled_count()
        );
        Ok(unit)
    }

    /// Move the cursor back to the live output clock.
    pub(crate) fn reset_cursor(&mut self) {
        self.cursor = self.timeline.clock_frames();
    }

    pub fn scheduled_count(&self) -> usize {
        self.timeline.scheduled_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AnalyserTap;
    use crate::error::LiveError;

    const CHUNK_FRAMES: usize = 4800;

    fn scheduler() -> PlaybackScheduler {
        PlaybackScheduler::new(PlaybackTimeline::new(
            PLAYBACK_SAMPLE_RATE,
            AnalyserTap::default(),
        ))
    }

    fn chunk(frames: usize) -> Vec<u8> {
        pcm::encode(&vec![0.1; frames])
    }

    fn advance_to(scheduler: &PlaybackScheduler, frame: u64) {
        let timeline = scheduler.timeline();
        let remaining = frame - timeline.clock_frames();
        let mut out = vec![0.0; remaining as usize];
        timeline.render(&mut out);
    }

    #[test]
    fn test_three_chunks_with_jitter() {
        let mut scheduler = scheduler();

        let first = scheduler.enqueue(&chunk(CHUNK_FRAMES)).unwrap();
        advance_to(&scheduler, 1200);
        let second = scheduler.enqueue(&chunk(CHUNK_FRAMES)).unwrap();
        advance_to(&scheduler, 12000);
        let third = scheduler.enqueue(&chunk(CHUNK_FRAMES)).unwrap();

        assert_eq!(first.start_secs, 0.0);
        assert!((second.start_secs - 0.2).abs() < 1e-9);
        assert!((third.start_secs - 0.5).abs() < 1e-9);
        assert!((first.duration_secs - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_back_to_back_without_gap_or_overlap() {
        let mut scheduler = scheduler();
        let lengths = [480, 2400, 24, 9600, 1];
        let mut prev: Option<ScheduledUnit> = None;
        for (i, &len) in lengths.iter().enumerate() {
            if i == 2 {
                advance_to(&scheduler, 100);
            }
            let unit = scheduler.enqueue(&chunk(len)).unwrap();
            if let Some(prev) = prev {
                let expected = prev.start_secs + prev.duration_secs;
                assert!((unit.start_secs - expected).abs() < 1e-9);
            }
            prev = Some(unit);
        }
        assert_eq!(scheduler.scheduled_count(), lengths.len());
    }

    #[test]
    fn test_late_chunk_starts_at_clock() {
        let mut scheduler = scheduler();
        scheduler.enqueue(&chunk(240)).unwrap();
        advance_to(&scheduler, 2400);
        assert_eq!(scheduler.scheduled_count(), 0);

        let unit = scheduler.enqueue(&chunk(240)).unwrap();
        assert!((unit.start_secs - 0.1).abs() < 1e-9);
        assert_eq!(scheduler.cursor_frames(), 2640);
    }

    #[test]
    fn test_invalid_chunk_leaves_cursor() {
        let mut scheduler = scheduler();
        scheduler.enqueue(&chunk(100)).unwrap();
        let err = scheduler.enqueue(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, LiveError::InvalidPayload(_)));
        assert_eq!(scheduler.cursor_frames(), 100);
        assert_eq!(scheduler.scheduled_count(), 1);
    }
}
