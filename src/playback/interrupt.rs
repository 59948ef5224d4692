//! Barge-in handling.

use tracing::info;

use super::scheduler::PlaybackScheduler;

impl PlaybackScheduler {
    /// Cut off the reply the user is talking over.
    ///
    /// Every scheduled unit stops regardless of progress and the cursor
    /// returns to the live output clock, so the next chunk plays as soon as
    /// it arrives. Safe to call with nothing scheduled. Returns how many
    /// units were stopped.
    pub fn on_interrupt(&mut self) -> usize {
        let stopped = self.timeline().stop_all();
        self.reset_cursor();
        if stopped > 0 {
            info!(
                "Interrupted playback at {:.3}s, stopped {stopped} unit(s)",
                self.cursor_secs()
            );
        }
        stopped
    }
}
