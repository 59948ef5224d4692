//! In-memory transport and devices for driver tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::audio::frame::CaptureBlock;
use crate::capture::CaptureSink;
use crate::error::{LiveError, LiveResult};
use crate::io::audio::{ActiveStream, AudioDevices};
use crate::pipeline::Sink;
use crate::playback::PlaybackTimeline;

use super::config::LiveConfig;
use super::transport::{ClientMessage, ServerEvent, Transport, TransportHandle};

/// The far end of one fake connection.
pub struct FakeLink {
    pub outbound: UnboundedReceiver<ClientMessage>,
    pub events: UnboundedSender<ServerEvent>,
}

impl FakeLink {
    /// Everything the session has sent so far.
    pub fn drain(&mut self) -> Vec<ClientMessage> {
        let mut sent = Vec::new();
        while let Ok(message) = self.outbound.try_recv() {
            sent.push(message);
        }
        sent
    }
}

#[derive(Default)]
pub struct FakeTransport {
    pub links: Mutex<Vec<FakeLink>>,
    pub refuse: bool,
}

impl FakeTransport {
    pub fn connections(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub fn with_last<R>(&self, f: impl FnOnce(&mut FakeLink) -> R) -> R {
        let mut links = self.links.lock().unwrap();
        f(links.last_mut().expect("no connection"))
    }
}

impl Transport for FakeTransport {
    fn connect(&self, _config: &LiveConfig) -> LiveResult<TransportHandle> {
        if self.refuse {
            return Err(LiveError::TransportError("refused".into()));
        }
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.links.lock().unwrap().push(FakeLink {
            outbound: outbound_rx,
            events: events_tx,
        });
        Ok(TransportHandle::new(outbound_tx, events_rx))
    }
}

pub struct FakeStream {
    stopped: Arc<AtomicBool>,
}

impl ActiveStream for FakeStream {
    fn stop(&mut self) -> anyhow::Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDevices {
    pub deny_microphone: bool,
    pub deny_speaker: bool,
    pub speaker: Mutex<Option<PlaybackTimeline>>,
    pub microphone: Mutex<Option<CaptureSink>>,
    pub speaker_stopped: Arc<AtomicBool>,
    pub microphone_stopped: Arc<AtomicBool>,
    pub microphone_opens: AtomicUsize,
    /// When set, opening the microphone blocks until a value arrives.
    pub hold_microphone: Mutex<Option<std::sync::mpsc::Receiver<()>>>,
}

impl FakeDevices {
    /// Play `frames` frames through the speaker, advancing the output clock.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let speaker = self.speaker.lock().unwrap();
        let timeline = speaker.as_ref().expect("speaker not open");
        let mut out = vec![0.0; frames];
        timeline.render(&mut out);
        out
    }

    pub fn timeline(&self) -> PlaybackTimeline {
        self.speaker.lock().unwrap().clone().expect("speaker not open")
    }

    /// Feed one block through the microphone chain.
    pub fn speak(&self, samples: Vec<f32>) {
        let mut microphone = self.microphone.lock().unwrap();
        let sink = microphone.as_mut().expect("microphone not open");
        sink.push(CaptureBlock::new(samples).unwrap());
    }
}

impl AudioDevices for FakeDevices {
    fn open_speaker(&self, source: PlaybackTimeline) -> LiveResult<Box<dyn ActiveStream>> {
        if self.deny_speaker {
            return Err(LiveError::OutputUnavailable("no output device".into()));
        }
        *self.speaker.lock().unwrap() = Some(source);
        self.speaker_stopped.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            stopped: self.speaker_stopped.clone(),
        }))
    }

    fn open_microphone(&self, sink: CaptureSink) -> LiveResult<Box<dyn ActiveStream>> {
        self.microphone_opens.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold_microphone.lock().unwrap().take();
        if let Some(hold) = hold {
            let _ = hold.recv();
        }
        if self.deny_microphone {
            return Err(LiveError::MicrophoneUnavailable("permission denied".into()));
        }
        *self.microphone.lock().unwrap() = Some(sink);
        self.microphone_stopped.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            stopped: self.microphone_stopped.clone(),
        }))
    }
}

/// Wait for a stream released off the session task to report stopped.
pub async fn wait_until(flag: &AtomicBool) {
    for _ in 0..500 {
        if flag.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("stream was never stopped");
}
