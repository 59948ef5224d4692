//! User interface components.
//!
//! This module provides the Dioxus-based UI for the application:
//!
//! - [`app`] - Main window: status text, start/stop button, error banner
//! - [`orb`] - Volume-driven orb

mod app;
mod orb;

pub use app::App;
