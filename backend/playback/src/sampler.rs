use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::sink::AudioSink;

/// Snapshot published to progress subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub position: Duration,
    pub duration: Duration,
}

/// Background task polling the sink's position.
///
/// The task is aborted when the sampler is dropped, so holding one is the
/// same thing as sampling.
pub struct ProgressSampler {
    handle: JoinHandle<()>,
}

impl ProgressSampler {
    pub fn start(
        sink: Arc<dyn AudioSink>,
        duration: Duration,
        progress: Arc<watch::Sender<Progress>>,
        every: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let position = sink.position().min(duration);
                progress.send_replace(Progress { position, duration });
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ProgressSampler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
