//! Playback of recorded traces.
//!
//! The [`projector`] turns steps into per-subject visual roles; the
//! [`controller`] replays a trace over time into a caller-supplied
//! [`PlaybackSink`], with pause, resume and cancel. [`scrub`] jumps straight
//! to any step using the same projection.

pub mod controller;
pub mod projector;
pub mod scrub;

pub use controller::{
    Phase, PlaybackConfig, PlaybackController, PlaybackHandle, PlaybackOutcome, PlaybackSink,
    RunId, DEFAULT_DELAY,
};
pub use projector::{project, project_prefix, VisualState};
pub use scrub::{scrub, Scrubbed};
