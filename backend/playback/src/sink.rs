use std::time::Duration;

use async_trait::async_trait;
use sanjeevani_core::AudioReference;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The environment refused to start audio without a user gesture.
    #[error("autoplay was blocked")]
    AutoplayBlocked,

    #[error("could not load audio: {0}")]
    Load(String),

    #[error("audio output failed: {0}")]
    Output(String),
}

/// Whatever actually renders audio: a browser element, a device, a test double.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Fetch or decode the source. Returns its duration.
    async fn load(&self, source: &AudioReference) -> Result<Duration, PlaybackError>;

    async fn play(&self) -> Result<(), PlaybackError>;

    fn pause(&self);

    fn seek(&self, position: Duration);

    /// Current play position.
    fn position(&self) -> Duration;
}
