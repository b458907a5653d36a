//! Narration playback.
//!
//! [`PlaybackController`] drives an [`AudioSink`] through
//! `Idle → Loading → Playing ⇄ Paused → Ended`, with `Ended` rewinding to
//! `Idle` on replay. A [`ProgressSampler`] publishes the play position on a
//! watch channel and only exists while the controller is `Playing`.

pub mod controller;
pub mod sampler;
pub mod sink;

pub use controller::{PlaybackController, PlaybackState, DEFAULT_SAMPLE_INTERVAL};
pub use sampler::{Progress, ProgressSampler};
pub use sink::{AudioSink, PlaybackError};
