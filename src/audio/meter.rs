//! Combined loudness of the capture and playback paths.

use super::analyser::{AnalyserTap, SpectrumAnalyser};

/// Mean bin level that reads as full volume; tuned for speech.
pub const VOLUME_SENSITIVITY: f32 = 100.0;

/// Drives the orb: one normalized loudness value per frame tick.
///
/// Both paths are analysed independently and the louder one wins, so the
/// indicator reacts to whoever is speaking.
pub struct VolumeMeter {
    capture_tap: AnalyserTap,
    playback_tap: AnalyserTap,
    capture: SpectrumAnalyser,
    playback: SpectrumAnalyser,
    sensitivity: f32,
}

impl VolumeMeter {
    pub fn new(capture_tap: AnalyserTap, playback_tap: AnalyserTap) -> Self {
        Self {
            capture_tap,
            playback_tap,
            capture: SpectrumAnalyser::default(),
            playback: SpectrumAnalyser::default(),
            sensitivity: VOLUME_SENSITIVITY,
        }
    }

    pub fn capture_tap(&self) -> &AnalyserTap {
        &self.capture_tap
    }

    pub fn playback_tap(&self) -> &AnalyserTap {
        &self.playback_tap
    }

    /// Analyse both taps once and return the volume in `[0, 1]`.
    pub fn tick(&mut self) -> f32 {
        let capture = self.capture.mean_level(&self.capture_tap);
        let playback = self.playback.mean_level(&self.playback_tap);
        normalize(capture.max(playback), self.sensitivity)
    }

    /// Drop analysis history and buffered samples.
    pub fn reset(&mut self) {
        self.capture.reset();
        self.playback.reset();
        self.capture_tap.clear();
        self.playback_tap.clear();
    }
}

fn normalize(level: f32, sensitivity: f32) -> f32 {
    if !level.is_finite() || sensitivity <= 0.0 {
        return 0.0;
    }
    (level / sensitivity).clamp(0.0, 1.0)
}
