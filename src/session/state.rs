//! Observable session state shared with the UI.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl LiveStatus {
    /// Whether a session is running or being set up.
    pub fn is_active(self) -> bool {
        matches!(self, LiveStatus::Connecting | LiveStatus::Connected)
    }

    pub fn label(self) -> &'static str {
        match self {
            LiveStatus::Disconnected => "Disconnected",
            LiveStatus::Connecting => "Connecting",
            LiveStatus::Connected => "Connected",
            LiveStatus::Error => "Error",
        }
    }
}

/// Point-in-time copy of [`LiveState`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveSnapshot {
    pub status: LiveStatus,
    pub error_message: Option<String>,
    pub volume: f32,
}

/// Written by the session driver, read by anyone.
#[derive(Default)]
pub struct LiveState {
    status: Mutex<LiveStatus>,
    error_message: Mutex<Option<String>>,
    // f32 bits
    volume: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LiveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> LiveStatus {
        *lock(&self.status)
    }

    pub fn error_message(&self) -> Option<String> {
        lock(&self.error_message).clone()
    }

    /// Current loudness; 0 unless connected.
    pub fn volume(&self) -> f32 {
        if self.status() != LiveStatus::Connected {
            return 0.0;
        }
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            status: self.status(),
            error_message: self.error_message(),
            volume: self.volume(),
        }
    }

    pub(crate) fn set_status(&self, status: LiveStatus) {
        *lock(&self.status) = status;
        if status != LiveStatus::Connected {
            self.set_volume(0.0);
        }
    }

    pub(crate) fn set_error(&self, message: Option<String>) {
        *lock(&self.error_message) = message;
    }

    pub(crate) fn set_volume(&self, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.volume.store(volume.to_bits(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_zero_unless_connected() {
        let state = LiveState::new();
        state.set_volume(0.7);
        assert_eq!(state.volume(), 0.0);

        state.set_status(LiveStatus::Connected);
        state.set_volume(0.7);
        assert_eq!(state.volume(), 0.7);

        state.set_status(LiveStatus::Error);
        assert_eq!(state.volume(), 0.0);
    }

    #[test]
    fn test_volume_is_clamped() {
        let state = LiveState::new();
        state.set_status(LiveStatus::Connected);
        state.set_volume(3.0);
        assert_eq!(state.volume(), 1.0);
        state.set_volume(f32::NAN);
        assert_eq!(state.volume(), 0.0);
    }

    #[test]
    fn test_snapshot() {
        let state = LiveState::new();
        state.set_error(Some("boom".into()));
        assert_eq!(
            state.snapshot(),
            LiveSnapshot {
                status: LiveStatus::Disconnected,
                error_message: Some("boom".into()),
                volume: 0.0,
            }
        );
    }
}
