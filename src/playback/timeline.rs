//! Shared playback timeline rendered by the output device.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::audio::AnalyserTap;

/// Opaque handle to one scheduled unit.
pub type UnitId = u64;

/// A decoded reply segment placed on the timeline.
#[derive(Debug, Clone)]
pub struct PlaybackUnit {
    start_frame: u64,
    samples: Vec<f32>,
}

impl PlaybackUnit {
    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }
}

#[derive(Default)]
struct TimelineInner {
    units: BTreeMap<UnitId, PlaybackUnit>,
    clock: u64,
    next_id: UnitId,
}

/// Scheduled units plus the output clock, shared between the session loop
/// and the output device thread.
///
/// The clock counts frames rendered so far and only moves forward through
/// [`PlaybackTimeline::render`]. Units are kept in an arena keyed by
/// [`UnitId`]; a unit leaves it either by finishing during a render or by
/// an explicit stop, whichever comes first.
#[derive(Clone)]
pub struct PlaybackTimeline {
    inner: Arc<Mutex<TimelineInner>>,
    tap: AnalyserTap,
    sample_rate: u32,
}

impl PlaybackTimeline {
    pub fn new(sample_rate: u32, tap: AnalyserTap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimelineInner::default())),
            tap,
            sample_rate,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimelineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn clock_frames(&self) -> u64 {
        self.lock().clock
    }

    pub fn frames_to_secs(&self, frames: u64) -> f64 {
        frames as f64 / self.sample_rate as f64
    }

    /// Place `samples` at `max(not_before, clock)`.
    ///
    /// Reading the clock and inserting happen under one lock so the output
    /// thread cannot render past the chosen start in between.
    pub fn schedule(&self, samples: Vec<f32>, not_before: u64) -> (UnitId, u64) {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let start_frame = not_before.max(inner.clock);
        inner.units.insert(
            id,
            PlaybackUnit {
                start_frame,
                samples,
            },
        );
        (id, start_frame)
    }

    /// Stop every scheduled unit, returning how many were still live.
    pub fn stop_all(&self) -> usize {
        let mut inner = self.lock();
        let stopped = inner.units.len();
        inner.units.clear();
        stopped
    }

    pub fn scheduled_count(&self) -> usize {
        self.lock().units.len()
    }

    /// Scheduled units in scheduling order.
    #[cfg(test)]
    pub fn scheduled(&self) -> Vec<PlaybackUnit> {
        self.lock().units.values().cloned().collect()
    }

    /// Render the next `out.len()` frames and advance the clock past them.
    ///
    /// Units overlapping the window are mixed in; units that end inside it
    /// are dropped. The rendered mix is written to the playback tap.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);
        {
            let mut inner = self.lock();
            let window_start = inner.clock;
            let window_end = window_start + out.len() as u64;

            inner.units.retain(|_, unit| {
                let from = unit.start_frame().max(window_start);
                let to = unit.end_frame().min(window_end);
                if from < to {
                    let src = (from - unit.start_frame()) as usize;
                    let dst = (from - window_start) as usize;
                    let len = (to - from) as usize;
                    for (o, s) in out[dst..dst + len]
                        .iter_mut()
                        .zip(&unit.samples[src..src + len])
                    {
                        *o += *s;
                    }
                }
                unit.end_frame() > window_end
            });

            inner.clock = window_end;
        }
        self.tap.write(out);
    }
}
