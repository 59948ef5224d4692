//! Push-based processing chains used on the capture path.

pub mod traits;

pub use traits::{Chained, Node, Sink};
