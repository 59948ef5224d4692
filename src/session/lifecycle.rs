//! Session lifecycle.
//!
//! A [`SessionDriver`] owns at most one [`Session`] and is the only code that
//! mutates it. Every input arrives as an [`Event`]:
//!
//! - commands from the UI (start, stop)
//! - server events from the transport
//! - encoded microphone frames
//! - frame ticks for the volume meter, present only while connected
//! - results of device opens, which run on the blocking pool
//!
//! [`SessionDriver::run`] multiplexes those sources on one task and feeds
//! them to [`SessionDriver::handle`] one at a time. Nothing on that task
//! waits on a device: opening and stopping streams happens off it.

use std::fmt;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::frame::PLAYBACK_SAMPLE_RATE;
use crate::audio::{AnalyserTap, VolumeMeter, WireChunk};
use crate::capture::capture_chain;
use crate::error::{LiveError, LiveResult};
use crate::io::audio::{ActiveStream, AudioDevices};
use crate::playback::{PlaybackScheduler, PlaybackTimeline};

use super::config::LiveConfig;
use super::state::{LiveState, LiveStatus};
use super::transport::{ServerEvent, Transport, TransportHandle};

/// Volume meter cadence, about one display frame.
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Speaker,
    Microphone,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Speaker => f.write_str("speaker"),
            Device::Microphone => f.write_str("microphone"),
        }
    }
}

type DeviceResult = LiveResult<Box<dyn ActiveStream>>;

pub enum Event {
    Command(Command),
    Server(ServerEvent),
    Frame(WireChunk),
    Tick,
    Device(Device, DeviceResult),
}

/// Resources of one running conversation.
struct Session {
    id: Uuid,
    transport: TransportHandle,
    speaker: Option<Box<dyn ActiveStream>>,
    speaker_opening: Option<JoinHandle<DeviceResult>>,
    microphone: Option<Box<dyn ActiveStream>>,
    microphone_opening: Option<JoinHandle<DeviceResult>>,
    frames: Option<UnboundedReceiver<WireChunk>>,
    scheduler: PlaybackScheduler,
    meter: VolumeMeter,
    ticker: Option<Interval>,
}

pub struct SessionDriver {
    config: LiveConfig,
    transport: Arc<dyn Transport>,
    devices: Arc<dyn AudioDevices>,
    state: Arc<LiveState>,
    session: Option<Session>,
}

impl SessionDriver {
    pub fn new(
        config: LiveConfig,
        transport: Arc<dyn Transport>,
        devices: Arc<dyn AudioDevices>,
        state: Arc<LiveState>,
    ) -> Self {
        Self {
            config,
            transport,
            devices,
            state,
            session: None,
        }
    }

    /// Drive the session until every command sender is gone.
    pub async fn run(mut self, mut commands: UnboundedReceiver<Command>) {
        while let Some(event) = self.next_event(&mut commands).await {
            self.handle(event);
        }

        self.teardown();
        debug!("Session driver stopped");
    }

    /// Wait for the next input. `None` once the command channel is closed.
    async fn next_event(&mut self, commands: &mut UnboundedReceiver<Command>) -> Option<Event> {
        let Some(session) = self.session.as_mut() else {
            return commands.recv().await.map(Event::Command);
        };
        let Session {
            transport,
            frames,
            ticker,
            speaker_opening,
            microphone_opening,
            ..
        } = session;

        tokio::select! {
            command = commands.recv() => command.map(Event::Command),
            server = transport.recv() => {
                Some(Event::Server(server.unwrap_or(ServerEvent::Closed)))
            }
            Some(frame) = next_frame(frames) => Some(Event::Frame(frame)),
            _ = next_tick(ticker) => Some(Event::Tick),
            result = next_open(Device::Speaker, speaker_opening) => {
                Some(Event::Device(Device::Speaker, result))
            }
            result = next_open(Device::Microphone, microphone_opening) => {
                Some(Event::Device(Device::Microphone, result))
            }
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Command(Command::Start) => self.start(),
            Event::Command(Command::Stop) => self.stop(),
            Event::Server(event) => self.on_server_event(event),
            Event::Frame(chunk) => self.on_frame(chunk),
            Event::Tick => self.on_tick(),
            Event::Device(device, result) => self.on_device(device, result),
        }
    }

    fn start(&mut self) {
        let status = self.state.status();
        if status.is_active() {
            warn!("Session already {}, ignoring start", status.label());
            return;
        }
        if let Err(e) = self.config.credential() {
            warn!("Cannot start session: {e}");
            self.state.set_error(Some(e.user_message()));
            return;
        }

        self.state.set_error(None);
        self.state.set_status(LiveStatus::Connecting);
        let id = Uuid::new_v4();
        info!("Session {id} connecting");

        let meter = VolumeMeter::new(AnalyserTap::default(), AnalyserTap::default());
        let timeline = PlaybackTimeline::new(PLAYBACK_SAMPLE_RATE, meter.playback_tap().clone());

        let source = timeline.clone();
        let speaker_opening =
            open_device(&self.devices, move |devices| devices.open_speaker(source));
        let transport = match self.transport.connect(&self.config) {
            Ok(transport) => transport,
            Err(e) => {
                abandon(Device::Speaker, speaker_opening);
                return self.fail(e);
            }
        };

        self.session = Some(Session {
            id,
            transport,
            speaker: None,
            speaker_opening: Some(speaker_opening),
            microphone: None,
            microphone_opening: None,
            frames: None,
            scheduler: PlaybackScheduler::new(timeline),
            meter,
            ticker: None,
        });
    }

    fn stop(&mut self) {
        if self.session.is_none() && self.state.status() == LiveStatus::Disconnected {
            return;
        }
        self.teardown();
        self.state.set_status(LiveStatus::Disconnected);
        info!("Session stopped");
    }

    fn on_device(&mut self, device: Device, result: DeviceResult) {
        let Some(session) = self.session.as_mut() else {
            if let Ok(stream) = result {
                debug!("Releasing {device} opened after the session ended");
                release(vec![(device, stream)]);
            }
            return;
        };

        match result {
            Ok(stream) => {
                info!("Session {} {device} ready", session.id);
                match device {
                    Device::Speaker => session.speaker = Some(stream),
                    Device::Microphone => session.microphone = Some(stream),
                }
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_server_event(&mut self, event: ServerEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!("Ignoring {event:?} without a session");
            return;
        };

        match event {
            ServerEvent::Opened => self.on_opened(),
            ServerEvent::Audio(bytes) => {
                match session.scheduler.enqueue(&bytes) {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => self.fail(e),
                    Err(e) => warn!("Dropping reply chunk: {e}"),
                }
            }
            ServerEvent::Interrupted => {
                session.scheduler.on_interrupt();
            }
            ServerEvent::TurnComplete => debug!("Model turn complete"),
            ServerEvent::Closed => {
                info!("Session {} closed by remote", session.id);
                self.teardown();
                self.state.set_status(LiveStatus::Disconnected);
            }
            ServerEvent::Error(message) => self.fail(LiveError::TransportError(message)),
        }
    }

    fn on_opened(&mut self) {
        if self.state.status() != LiveStatus::Connecting {
            debug!("Ignoring duplicate handshake");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        self.state.set_status(LiveStatus::Connected);
        info!("Session {} connected", session.id);

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        session.ticker = Some(ticker);

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let sink = capture_chain(frames_tx, session.meter.capture_tap().clone());
        session.frames = Some(frames_rx);
        session.microphone_opening = Some(open_device(&self.devices, move |devices| {
            devices.open_microphone(sink)
        }));
    }

    fn on_frame(&mut self, chunk: WireChunk) {
        match self.session.as_ref() {
            Some(session) if self.state.status() == LiveStatus::Connected => {
                if let Err(e) = session.transport.send(chunk) {
                    warn!("Dropping capture frame: {e}");
                }
            }
            _ => warn!("Dropping capture frame, session is not connected"),
        }
    }

    fn on_tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.ticker.is_some() {
            let volume = session.meter.tick();
            self.state.set_volume(volume);
        }
    }

    fn fail(&mut self, err: LiveError) {
        error!("Session failed: {err}");
        self.teardown();
        self.state.set_error(Some(err.user_message()));
        self.state.set_status(LiveStatus::Error);
    }

    /// Release everything the session holds. Each step is attempted even if
    /// an earlier one failed.
    fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Some(opening) = session.microphone_opening.take() {
            abandon(Device::Microphone, opening);
        }
        if let Some(opening) = session.speaker_opening.take() {
            abandon(Device::Speaker, opening);
        }

        let mut streams = Vec::new();
        if let Some(microphone) = session.microphone.take() {
            streams.push((Device::Microphone, microphone));
        }
        if let Some(mut frames) = session.frames.take() {
            frames.close();
        }

        let stopped = session.scheduler.timeline().stop_all();
        session.scheduler.reset_cursor();
        if stopped > 0 {
            debug!("Stopped {stopped} pending playback unit(s)");
        }

        if let Some(speaker) = session.speaker.take() {
            streams.push((Device::Speaker, speaker));
        }
        release(streams);

        session.transport.close();
        session.ticker = None;
        session.meter.reset();
        self.state.set_volume(0.0);
        info!("Session {} torn down", session.id);
    }
}

/// Open a device on the blocking pool; some hosts hold the call while asking
/// the user for permission.
fn open_device<F>(devices: &Arc<dyn AudioDevices>, open: F) -> JoinHandle<DeviceResult>
where
    F: FnOnce(&dyn AudioDevices) -> DeviceResult + Send + 'static,
{
    let devices = devices.clone();
    tokio::task::spawn_blocking(move || open(devices.as_ref()))
}

/// Stop `streams` in order, on the blocking pool when a runtime is around.
fn release(streams: Vec<(Device, Box<dyn ActiveStream>)>) {
    if streams.is_empty() {
        return;
    }
    let stop_all = move || {
        for (device, mut stream) in streams {
            if let Err(e) = stream.stop() {
                warn!("Failed to stop {device}: {e:#}");
            }
        }
    };
    match Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(stop_all);
        }
        Err(_) => stop_all(),
    }
}

/// Let a device open finish in the background and release whatever it yields.
fn abandon(device: Device, opening: JoinHandle<DeviceResult>) {
    debug!("Abandoning {device} open");
    tokio::spawn(async move {
        if let Ok(Ok(stream)) = opening.await {
            debug!("Releasing {device} opened after teardown");
            release(vec![(device, stream)]);
        }
    });
}

async fn next_frame(frames: &mut Option<UnboundedReceiver<WireChunk>>) -> Option<WireChunk> {
    match frames {
        Some(frames) => frames.recv().await,
        None => future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}

async fn next_open(
    device: Device,
    opening: &mut Option<JoinHandle<DeviceResult>>,
) -> DeviceResult {
    let Some(handle) = opening.as_mut() else {
        return future::pending().await;
    };
    let result = handle.await.unwrap_or_else(|e| {
        let reason = format!("{device} open did not complete: {e}");
        Err(match device {
            Device::Speaker => LiveError::OutputUnavailable(reason),
            Device::Microphone => LiveError::MicrophoneUnavailable(reason),
        })
    });
    *opening = None;
    result
}
