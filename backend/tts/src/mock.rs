use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sanjeevani_core::ScanError;

use crate::engine::{SpeechOutput, TtsProvider, TtsRequest, SPEECH_MIME_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Speak,
    Fail,
    Hang,
}

/// A speech provider that returns fixed audio and records what it was asked to say.
pub struct MockTts {
    audio: Bytes,
    behaviour: Behaviour,
    requests: Mutex<Vec<TtsRequest>>,
}

impl MockTts {
    pub fn new(audio: impl Into<Bytes>) -> Self {
        Self {
            audio: audio.into(),
            behaviour: Behaviour::Speak,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a 503.
    pub fn failing() -> Self {
        Self {
            behaviour: Behaviour::Fail,
            ..Self::new(Bytes::new())
        }
    }

    /// Every call blocks for an hour.
    pub fn hanging() -> Self {
        Self {
            behaviour: Behaviour::Hang,
            ..Self::new(Bytes::new())
        }
    }

    pub fn requests(&self) -> Vec<TtsRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TtsProvider for MockTts {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, req: TtsRequest) -> Result<SpeechOutput, ScanError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }
        match self.behaviour {
            Behaviour::Speak => Ok(SpeechOutput::Inline {
                bytes: self.audio.clone(),
                mime_type: SPEECH_MIME_TYPE,
            }),
            Behaviour::Fail => Err(ScanError::upstream("mock", Some(503), "speech unavailable")),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ScanError::upstream("mock", None, "unreachable"))
            }
        }
    }
}
