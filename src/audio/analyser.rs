//! Frequency-domain loudness analysis.
//!
//! An [`AnalyserTap`] is a cheap clonable handle that signal paths write
//! into from their audio threads; it keeps only the most recent analysis
//! window. A [`SpectrumAnalyser`] turns a tap's window into byte-scaled
//! frequency bins the same way a Web Audio `AnalyserNode` does:
//!
//! 1. Blackman window over the last `fft_size` samples
//! 2. FFT, magnitude scaled by `1 / fft_size`
//! 3. exponential smoothing against the previous tick
//! 4. dB conversion and linear mapping of `[min_db, max_db]` onto `0..=255`

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Analysis window length; yields `FFT_SIZE / 2` frequency bins.
pub const FFT_SIZE: usize = 256;
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.5;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// Non-destructive tap point on a signal path.
#[derive(Clone)]
pub struct AnalyserTap {
    window: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl AnalyserTap {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append samples, discarding whatever falls out of the window.
    pub fn write(&self, samples: &[f32]) {
        let mut window = self.lock();
        let keep = samples.len().min(self.capacity);
        let overflow = (window.len() + keep).saturating_sub(self.capacity);
        window.drain(..overflow);
        window.extend(&samples[samples.len() - keep..]);
    }

    /// The latest `capacity` samples, zero-padded at the front when fewer
    /// have been written.
    pub fn snapshot(&self) -> Vec<f32> {
        let window = self.lock();
        let mut out = vec![0.0; self.capacity - window.len()];
        out.extend(window.iter());
        out
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for AnalyserTap {
    fn default() -> Self {
        Self::new(FFT_SIZE)
    }
}

pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        Self {
            fft,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothing: smoothing.clamp(0.0, 1.0),
            min_db: MIN_DECIBELS,
            max_db: MAX_DECIBELS,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Byte-scaled spectrum of the tap's current window.
    pub fn byte_frequency_data(&mut self, tap: &AnalyserTap) -> Vec<u8> {
        let samples = tap.snapshot();
        let n = self.fft_size();

        let offset = samples.len().saturating_sub(n);
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = samples.get(offset + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let range = self.max_db - self.min_db;
        let tau = self.smoothing;
        self.smoothed
            .iter_mut()
            .zip(&self.scratch)
            .map(|(prev, bin)| {
                let magnitude = bin.norm() / n as f32;
                *prev = tau * *prev + (1.0 - tau) * magnitude;
                if !prev.is_finite() {
                    *prev = 0.0;
                }
                let db = 20.0 * prev.log10();
                let scaled = (255.0 / range) * (db - self.min_db);
                if scaled.is_nan() {
                    0
                } else {
                    scaled.clamp(0.0, 255.0) as u8
                }
            })
            .collect()
    }

    /// Mean of [`Self::byte_frequency_data`], in `0.0..=255.0`.
    pub fn mean_level(&mut self, tap: &AnalyserTap) -> f32 {
        let bins = self.byte_frequency_data(tap);
        if bins.is_empty() {
            return 0.0;
        }
        bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32
    }

    /// Forget smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new(FFT_SIZE, SMOOTHING_TIME_CONSTANT)
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * std::f32::consts::PI * x).cos()
                + a2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                amplitude * (2.0 * std::f32::consts::PI * freq_bin * i as f32 / FFT_SIZE as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_tap_keeps_latest_window() {
        let tap = AnalyserTap::new(4);
        tap.write(&[1.0, 2.0]);
        assert_eq!(tap.snapshot(), vec![0.0, 0.0, 1.0, 2.0]);

        tap.write(&[3.0, 4.0, 5.0]);
        assert_eq!(tap.snapshot(), vec![2.0, 3.0, 4.0, 5.0]);

        tap.write(&[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(tap.snapshot(), vec![8.0, 9.0, 10.0, 11.0]);

        tap.clear();
        assert_eq!(tap.snapshot(), vec![0.0; 4]);
    }

    #[test]
    fn test_silence_reads_zero() {
        let tap = AnalyserTap::default();
        tap.write(&vec![0.0; FFT_SIZE]);
        let mut analyser = SpectrumAnalyser::default();
        let bins = analyser.byte_frequency_data(&tap);
        assert_eq!(bins.len(), 128);
        assert!(bins.iter().all(|&b| b == 0));
        assert_eq!(analyser.mean_level(&tap), 0.0);
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        let tap = AnalyserTap::default();
        // Quiet enough that the main lobe stays below the byte ceiling.
        tap.write(&sine(16.0, 0.01, FFT_SIZE));
        let mut analyser = SpectrumAnalyser::new(FFT_SIZE, 0.0);
        let bins = analyser.byte_frequency_data(&tap);

        let (peak, _) = bins.iter().enumerate().max_by_key(|(_, b)| **b).unwrap();
        assert_eq!(peak, 16);
        assert!(bins[16] > bins[15] && bins[16] > bins[17]);
        assert!(bins[16] < 255);
        assert_eq!(bins[40], 0);
    }

    #[test]
    fn test_louder_signal_reads_higher() {
        let quiet = AnalyserTap::default();
        quiet.write(&sine(10.0, 0.01, FFT_SIZE));
        let loud = AnalyserTap::default();
        loud.write(&sine(10.0, 0.9, FFT_SIZE));

        let mut a = SpectrumAnalyser::new(FFT_SIZE, 0.0);
        let mut b = SpectrumAnalyser::new(FFT_SIZE, 0.0);
        assert!(b.mean_level(&loud) > a.mean_level(&quiet));
    }

    #[test]
    fn test_smoothing_decays_after_signal_stops() {
        let tap = AnalyserTap::default();
        tap.write(&sine(20.0, 0.9, FFT_SIZE));
        let mut analyser = SpectrumAnalyser::default();
        let first = analyser.mean_level(&tap);

        tap.write(&vec![0.0; FFT_SIZE]);
        let decayed = analyser.mean_level(&tap);
        assert!(decayed > 0.0, "smoothing keeps some energy for one tick");
        assert!(decayed < first);

        analyser.reset();
        assert_eq!(analyser.mean_level(&tap), 0.0);
    }
}
