use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sanjeevani_core::AudioReference;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::sampler::{Progress, ProgressSampler};
use crate::sink::{AudioSink, PlaybackError};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Playback state machine for one narration at a time.
///
/// Driven from a single task. The progress sampler runs exactly while the
/// state is `Playing`.
pub struct PlaybackController {
    sink: Arc<dyn AudioSink>,
    state: PlaybackState,
    loaded: bool,
    duration: Duration,
    progress: Arc<watch::Sender<Progress>>,
    sampler: Option<ProgressSampler>,
    sample_every: Duration,
}

impl PlaybackController {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self::with_sample_interval(sink, DEFAULT_SAMPLE_INTERVAL)
    }

    pub fn with_sample_interval(sink: Arc<dyn AudioSink>, sample_every: Duration) -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self {
            sink,
            state: PlaybackState::Idle,
            loaded: false,
            duration: Duration::ZERO,
            progress: Arc::new(progress),
            sampler: None,
            sample_every,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.as_ref().is_some_and(ProgressSampler::is_running)
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Load a narration and try to start it.
    ///
    /// A blocked autoplay is not an error: the controller lands in `Paused`
    /// and waits for an explicit [`play`](Self::play).
    pub async fn load(&mut self, source: &AudioReference) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Playing {
            self.sink.pause();
        }
        self.stop_sampling();
        self.state = PlaybackState::Loading;
        self.loaded = false;

        let duration = match self.sink.load(source).await {
            Ok(duration) => duration,
            Err(err) => {
                warn!(error = %err, "Narration audio failed to load");
                self.state = PlaybackState::Idle;
                self.duration = Duration::ZERO;
                return Err(err);
            }
        };
        self.loaded = true;
        self.duration = duration;
        self.publish(Duration::ZERO);
        debug!(duration_ms = duration.as_millis() as u64, "Narration loaded");

        match self.sink.play().await {
            Ok(()) => {
                self.enter_playing();
                Ok(())
            }
            Err(PlaybackError::AutoplayBlocked) => {
                info!("Autoplay blocked; waiting for user");
                self.state = PlaybackState::Paused;
                Ok(())
            }
            Err(err) => {
                self.state = PlaybackState::Paused;
                Err(err)
            }
        }
    }

    /// Start or resume. From `Ended` this rewinds first.
    pub async fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Playing | PlaybackState::Loading => return Ok(()),
            PlaybackState::Ended => self.rewind(),
            PlaybackState::Idle | PlaybackState::Paused => {}
        }
        if !self.loaded {
            return Ok(());
        }
        self.sink.play().await?;
        self.enter_playing();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.sink.pause();
        self.stop_sampling();
        self.state = PlaybackState::Paused;
        self.publish(self.sink.position());
    }

    pub async fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play().await
        }
    }

    /// Jump to an absolute time in seconds, clamped to `[0, duration]`.
    /// Does nothing when no audio is loaded.
    pub fn seek(&mut self, seconds: f64) {
        if !self.loaded || self.state == PlaybackState::Loading {
            return;
        }
        let target = if seconds.is_finite() && seconds > 0.0 {
            Duration::from_secs_f64(seconds.min(self.duration.as_secs_f64()))
        } else {
            Duration::ZERO
        };
        self.sink.seek(target);
        if self.state == PlaybackState::Ended && target < self.duration {
            self.state = PlaybackState::Paused;
        }
        self.publish(target);
    }

    /// The sink reached the end of the audio.
    pub fn on_ended(&mut self) {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return;
        }
        self.stop_sampling();
        self.state = PlaybackState::Ended;
        self.publish(self.duration);
    }

    /// `Ended` back to `Idle` at position zero; the audio stays loaded.
    pub fn rewind(&mut self) {
        if self.state != PlaybackState::Ended {
            return;
        }
        self.sink.seek(Duration::ZERO);
        self.state = PlaybackState::Idle;
        self.publish(Duration::ZERO);
    }

    fn enter_playing(&mut self) {
        self.state = PlaybackState::Playing;
        self.sampler = Some(ProgressSampler::start(
            self.sink.clone(),
            self.duration,
            self.progress.clone(),
            self.sample_every,
        ));
    }

    fn stop_sampling(&mut self) {
        self.sampler = None;
    }

    fn publish(&self, position: Duration) {
        self.progress.send_replace(Progress {
            position,
            duration: self.duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSinkState {
        position: Duration,
        playing: bool,
        seeks: Vec<Duration>,
    }

    struct FakeSink {
        duration: Duration,
        autoplay_allowed: Mutex<bool>,
        fail_load: bool,
        state: Mutex<FakeSinkState>,
    }

    impl FakeSink {
        fn new(duration_secs: u64) -> Arc<Self> {
            Arc::new(Self {
                duration: Duration::from_secs(duration_secs),
                autoplay_allowed: Mutex::new(true),
                fail_load: false,
                state: Mutex::new(FakeSinkState::default()),
            })
        }

        fn blocking_autoplay(duration_secs: u64) -> Arc<Self> {
            let sink = Self::new(duration_secs);
            *sink.autoplay_allowed.lock().unwrap() = false;
            sink
        }

        fn set_position(&self, secs: f64) {
            self.state.lock().unwrap().position = Duration::from_secs_f64(secs);
        }

        fn is_playing(&self) -> bool {
            self.state.lock().unwrap().playing
        }

        fn seeks(&self) -> Vec<Duration> {
            self.state.lock().unwrap().seeks.clone()
        }
    }

    #[async_trait]
    impl AudioSink for FakeSink {
        async fn load(&self, _source: &AudioReference) -> Result<Duration, PlaybackError> {
            if self.fail_load {
                return Err(PlaybackError::Load("404".into()));
            }
            Ok(self.duration)
        }

        async fn play(&self) -> Result<(), PlaybackError> {
            let mut allowed = self.autoplay_allowed.lock().unwrap();
            if !*allowed {
                // the first refusal stands in for the missing user gesture
                *allowed = true;
                return Err(PlaybackError::AutoplayBlocked);
            }
            self.state.lock().unwrap().playing = true;
            Ok(())
        }

        fn pause(&self) {
            self.state.lock().unwrap().playing = false;
        }

        fn seek(&self, position: Duration) {
            let mut state = self.state.lock().unwrap();
            state.position = position;
            state.seeks.push(position);
        }

        fn position(&self) -> Duration {
            self.state.lock().unwrap().position
        }
    }

    fn source() -> AudioReference {
        AudioReference::Embedded {
            data_uri: "data:audio/mpeg;base64,SUQz".into(),
        }
    }

    fn controller(sink: &Arc<FakeSink>) -> PlaybackController {
        PlaybackController::with_sample_interval(sink.clone(), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn load_autoplays() {
        let sink = FakeSink::new(10);
        let mut ctl = controller(&sink);
        assert_eq!(ctl.state(), PlaybackState::Idle);

        ctl.load(&source()).await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Playing);
        assert_eq!(ctl.duration(), Duration::from_secs(10));
        assert!(ctl.is_sampling());
        assert!(sink.is_playing());
    }

    #[tokio::test]
    async fn blocked_autoplay_pauses_and_stays_usable() {
        let sink = FakeSink::blocking_autoplay(10);
        let mut ctl = controller(&sink);

        ctl.load(&source()).await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Paused);
        assert!(!ctl.is_sampling());

        ctl.play().await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Playing);
        assert!(ctl.is_sampling());
    }

    #[tokio::test]
    async fn failed_load_returns_to_idle() {
        let sink = Arc::new(FakeSink {
            duration: Duration::from_secs(3),
            autoplay_allowed: Mutex::new(true),
            fail_load: true,
            state: Mutex::new(FakeSinkState::default()),
        });
        let mut ctl = controller(&sink);
        assert!(matches!(ctl.load(&source()).await, Err(PlaybackError::Load(_))));
        assert_eq!(ctl.state(), PlaybackState::Idle);

        // nothing loaded, so play is inert
        ctl.play().await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn seek_clamps_to_duration() {
        let sink = FakeSink::new(8);
        let mut ctl = controller(&sink);
        ctl.load(&source()).await.unwrap();

        ctl.seek(42.0);
        assert_eq!(sink.position(), Duration::from_secs(8));
        ctl.seek(-3.0);
        assert_eq!(sink.position(), Duration::ZERO);
        ctl.seek(2.5);
        assert_eq!(sink.position(), Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn seek_far_past_end_lands_on_duration() {
        let sink = FakeSink::new(8);
        let mut ctl = controller(&sink);
        ctl.load(&source()).await.unwrap();

        ctl.seek(1e20);
        assert_eq!(sink.position(), Duration::from_secs(8));
        ctl.seek(f64::MAX);
        assert_eq!(sink.position(), Duration::from_secs(8));
        ctl.seek(f64::NAN);
        assert_eq!(sink.position(), Duration::ZERO);
    }

    #[tokio::test]
    async fn seek_while_idle_is_noop() {
        let sink = FakeSink::new(8);
        let mut ctl = controller(&sink);
        ctl.seek(3.0);
        assert!(sink.seeks().is_empty());
        assert_eq!(ctl.state(), PlaybackState::Idle);
        assert_eq!(ctl.subscribe().borrow().position, Duration::ZERO);
    }

    #[tokio::test]
    async fn pause_stops_sampling() {
        let sink = FakeSink::new(10);
        let mut ctl = controller(&sink);
        ctl.load(&source()).await.unwrap();
        let progress = ctl.subscribe();

        sink.set_position(1.5);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(progress.borrow().position, Duration::from_millis(1500));

        ctl.pause();
        assert_eq!(ctl.state(), PlaybackState::Paused);
        assert!(!ctl.is_sampling());
        assert!(!sink.is_playing());

        sink.set_position(4.0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(progress.borrow().position, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn end_then_replay_rewinds() {
        let sink = FakeSink::new(5);
        let mut ctl = controller(&sink);
        ctl.load(&source()).await.unwrap();
        sink.set_position(5.0);

        ctl.on_ended();
        assert_eq!(ctl.state(), PlaybackState::Ended);
        assert!(!ctl.is_sampling());
        assert_eq!(ctl.subscribe().borrow().position, Duration::from_secs(5));

        ctl.play().await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Playing);
        assert_eq!(sink.seeks().last(), Some(&Duration::ZERO));
    }

    #[tokio::test]
    async fn toggle_flips_between_playing_and_paused() {
        let sink = FakeSink::new(5);
        let mut ctl = controller(&sink);
        ctl.load(&source()).await.unwrap();
        ctl.toggle().await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Paused);
        ctl.toggle().await.unwrap();
        assert_eq!(ctl.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn dropping_controller_stops_sampler() {
        let sink = FakeSink::new(10);
        let mut ctl = controller(&sink);
        ctl.load(&source()).await.unwrap();
        let mut progress = ctl.subscribe();
        drop(ctl);

        // every sender is gone once the sampler task is torn down
        let closed = tokio::time::timeout(Duration::from_secs(1), async {
            while progress.changed().await.is_ok() {}
        })
        .await;
        assert!(closed.is_ok());
    }
}
