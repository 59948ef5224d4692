//! Reply playback.
//!
//! - [`PlaybackTimeline`] - scheduled units and the output clock, rendered by the speaker
//! - [`PlaybackScheduler`] - gapless arrival-order scheduling of inbound chunks
//! - [`interrupt`] - barge-in: stop everything and rewind the cursor

pub mod interrupt;
pub mod scheduler;
pub mod timeline;

pub use scheduler::{PlaybackScheduler, ScheduledUnit};
pub use timeline::{PlaybackTimeline, PlaybackUnit, UnitId};
