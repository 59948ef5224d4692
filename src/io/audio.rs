//! Audio device I/O using cpal.
//!
//! Provides:
//! - [`AudioDevices`] - the seam the session opens its microphone and speaker through
//! - [`CpalDevices`] - default-device implementation
//!
//! Each cpal stream lives on its own thread for its whole life; the session
//! only holds an [`ActiveStream`] handle that flips the callback off and
//! joins the thread on stop. Opening and stopping both block, so callers on
//! an async runtime run them on its blocking pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, StreamConfig};
use tracing::{debug, error, info, warn};

use crate::audio::frame::{CAPTURE_SAMPLE_RATE, CaptureBlock};
use crate::audio::resample::{PlaybackResampler, RESAMPLE_CHUNK, StreamResampler};
use crate::audio::sample::downmix_to_mono;
use crate::audio::AudioSample;
use crate::capture::CaptureSink;
use crate::error::{LiveError, LiveResult};
use crate::pipeline::Sink;
use crate::playback::PlaybackTimeline;

/// A running device stream.
pub trait ActiveStream: Send {
    /// Silence the callback and release the device. Calling it twice is harmless.
    fn stop(&mut self) -> Result<()>;
}

/// Opens the devices a session needs.
pub trait AudioDevices: Send + Sync {
    /// Start rendering `source` to the default output.
    fn open_speaker(&self, source: PlaybackTimeline) -> LiveResult<Box<dyn ActiveStream>>;

    /// Start feeding 16 kHz mono blocks from the default input into `sink`.
    fn open_microphone(&self, sink: CaptureSink) -> LiveResult<Box<dyn ActiveStream>>;
}

/// The host's default input and output devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalDevices;

impl AudioDevices for CpalDevices {
    fn open_speaker(&self, source: PlaybackTimeline) -> LiveResult<Box<dyn ActiveStream>> {
        DeviceThread::spawn("speaker", move |active| build_speaker(source, active))
            .map(|t| Box::new(t) as Box<dyn ActiveStream>)
            .map_err(|e| LiveError::OutputUnavailable(format!("{e:#}")))
    }

    fn open_microphone(&self, sink: CaptureSink) -> LiveResult<Box<dyn ActiveStream>> {
        DeviceThread::spawn("microphone", move |active| build_microphone(sink, active))
            .map(|t| Box::new(t) as Box<dyn ActiveStream>)
            .map_err(|e| LiveError::MicrophoneUnavailable(format!("{e:#}")))
    }
}

/// Owns one cpal stream on a dedicated thread.
struct DeviceThread {
    name: &'static str,
    active: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceThread {
    /// Run `build` on a new thread and wait until the stream is playing or has failed.
    fn spawn<F>(name: &'static str, build: F) -> Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) -> Result<cpal::Stream> + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let flag = active.clone();
        let handle = thread::Builder::new()
            .name(format!("audio-{name}"))
            .spawn(move || {
                let stream = match build(flag) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Parked until stop() or the handle is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .with_context(|| format!("Failed to spawn {name} thread"))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                name,
                active,
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(anyhow!("{name} thread exited during setup"))
            }
        }
    }
}

impl ActiveStream for DeviceThread {
    fn stop(&mut self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("{} thread panicked", self.name))?;
            info!("{} stream stopped", self.name);
        }
        Ok(())
    }
}

impl Drop for DeviceThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop {} stream: {e:#}", self.name);
        }
    }
}

fn build_microphone(sink: CaptureSink, active: Arc<AtomicBool>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default input device available")?;
    let supported = device
        .default_input_config()
        .context("Failed to query default input config")?;
    debug!("Input config: {supported:#?}");

    let channels = supported.channels() as usize;
    let rate = supported.sample_rate().0;
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::I16 => build_input::<i16>(&device, &config, rate, sink, active)?,
        SampleFormat::U16 => build_input::<u16>(&device, &config, rate, sink, active)?,
        SampleFormat::I32 => build_input::<i32>(&device, &config, rate, sink, active)?,
        SampleFormat::F32 => build_input::<f32>(&device, &config, rate, sink, active)?,
        format => bail!("Unsupported input sample format: {format:?}"),
    };
    stream.play().context("Failed to start input stream")?;
    info!(
        "Microphone input enabled: {} ({rate} Hz, {channels} ch)",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    Ok(stream)
}

fn build_input<S: AudioSample + SizedSample>(
    device: &Device,
    config: &StreamConfig,
    device_rate: u32,
    mut sink: CaptureSink,
    active: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let channels = config.channels as usize;
    let mut resampler = StreamResampler::new(device_rate, CAPTURE_SAMPLE_RATE, RESAMPLE_CHUNK)?;

    let stream = device.build_input_stream(
        config,
        move |data: &[S], _: &cpal::InputCallbackInfo| {
            if !active.load(Ordering::Relaxed) {
                return;
            }
            let mono = downmix_to_mono(data, channels);
            match resampler.process(&mono) {
                Ok(samples) if !samples.is_empty() => match CaptureBlock::new(samples) {
                    Ok(block) => sink.push(block),
                    Err(e) => error!("Dropping capture block: {e:#}"),
                },
                Ok(_) => {}
                Err(e) => error!("Capture resampling failed: {e:#}"),
            }
        },
        |err| error!("An error occurred on the input audio stream: {}", err),
        None,
    )?;
    Ok(stream)
}

fn build_speaker(source: PlaybackTimeline, active: Arc<AtomicBool>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No default output device available")?;
    let supported = device
        .default_output_config()
        .context("Failed to query default output config")?;
    debug!("Output config: {supported:#?}");

    let rate = supported.sample_rate().0;
    let config: StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::I16 => build_output::<i16>(&device, &config, rate, source, active)?,
        SampleFormat::U16 => build_output::<u16>(&device, &config, rate, source, active)?,
        SampleFormat::I32 => build_output::<i32>(&device, &config, rate, source, active)?,
        SampleFormat::F32 => build_output::<f32>(&device, &config, rate, source, active)?,
        format => bail!("Unsupported output sample format: {format:?}"),
    };
    stream.play().context("Failed to start output stream")?;
    info!(
        "Speaker output enabled: {} ({rate} Hz, {} ch)",
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        config.channels
    );
    Ok(stream)
}

fn build_output<S: AudioSample + SizedSample>(
    device: &Device,
    config: &StreamConfig,
    device_rate: u32,
    source: PlaybackTimeline,
    active: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let channels = (config.channels as usize).max(1);
    let mut resampler = PlaybackResampler::new(source.sample_rate(), device_rate)?;
    let mut mono: Vec<f32> = Vec::new();

    debug!("Building output stream");
    let stream = device.build_output_stream(
        config,
        move |data: &mut [S], _: &cpal::OutputCallbackInfo| {
            if !active.load(Ordering::Relaxed) {
                data.fill(S::silence());
                return;
            }
            mono.resize(data.len() / channels, 0.0);
            if let Err(e) = resampler.fill(&mut mono, |buf| source.render(buf)) {
                error!("Playback resampling failed: {e:#}");
                mono.fill(0.0);
            }
            for (frame, &value) in data.chunks_mut(channels).zip(&mono) {
                for slot in frame {
                    *slot = S::from_f32_normalized(value);
                }
            }
        },
        |err| error!("An error occurred on the output audio stream: {}", err),
        None,
    )?;
    Ok(stream)
}
