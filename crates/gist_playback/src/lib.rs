//! Sequential audio playback for narrated article summaries.
//!
//! [`PlaybackController`] owns the single audio output, keeps at most one
//! session live, auto-advances through the displayed list, and discards
//! synthesis results that arrive after the user has moved on.

pub mod controller;
pub mod device;
pub mod sink;

pub use controller::{PlaybackController, PlaybackSnapshot};
pub use device::DeviceSink;
pub use sink::TimedSink;
