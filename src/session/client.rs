//! Handle the UI holds on the session.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::warn;

use crate::io::audio::AudioDevices;

use super::config::LiveConfig;
use super::lifecycle::{Command, SessionDriver};
use super::state::{LiveSnapshot, LiveState, LiveStatus};
use super::transport::Transport;

/// Cheap to clone; every clone drives the same session.
#[derive(Clone)]
pub struct LiveClient {
    state: Arc<LiveState>,
    commands: UnboundedSender<Command>,
}

impl LiveClient {
    /// Spawn the session driver on `runtime` and return a handle to it.
    ///
    /// The driver exits once every clone of the client is dropped.
    pub fn spawn(
        runtime: &Handle,
        config: LiveConfig,
        transport: Arc<dyn Transport>,
        devices: Arc<dyn AudioDevices>,
    ) -> Self {
        let state = Arc::new(LiveState::new());
        let (commands, rx) = mpsc::unbounded_channel();
        let driver = SessionDriver::new(config, transport, devices, state.clone());
        runtime.spawn(driver.run(rx));
        Self { state, commands }
    }

    pub fn start(&self) {
        self.send(Command::Start);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Stop a running or connecting session, otherwise start one.
    pub fn toggle(&self) {
        if self.status().is_active() {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn status(&self) -> LiveStatus {
        self.state.status()
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.state.snapshot()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Session driver is not running, dropping {command:?}");
        }
    }
}
