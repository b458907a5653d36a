//! Narration: the exact advice string that is both displayed and spoken.

use std::sync::Arc;
use std::time::Duration;

use sanjeevani_core::{Language, ScanResult};
use tracing::{info, warn};

use crate::engine::{SpeechOutput, TtsProvider, TtsRequest};

/// Localized advice frozen for playback and display.
///
/// Immutable once composed; the advice panel and the speech request both
/// read from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    text: Arc<str>,
    language_code: String,
    english: Option<Arc<str>>,
}

impl Narration {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// Language the voice should use; unsupported requests fall back to English.
    pub fn speech_language(&self) -> &'static str {
        Language::resolve(&self.language_code).code()
    }

    /// English text for the side panel, present only when it differs.
    pub fn english_for_display(&self) -> Option<&str> {
        self.english.as_deref()
    }
}

pub struct NarrationComposer {
    tts: Option<Arc<dyn TtsProvider>>,
    timeout: Duration,
}

impl NarrationComposer {
    pub fn new(tts: Option<Arc<dyn TtsProvider>>, timeout: Duration) -> Self {
        Self { tts, timeout }
    }

    pub fn speech_enabled(&self) -> bool {
        self.tts.is_some()
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.tts.as_ref().map(|t| t.name())
    }

    /// Select the narration for a parsed result. `None` for fallback records
    /// and records whose advice is blank.
    pub fn compose(result: &ScanResult, language_code: &str) -> Option<Narration> {
        let text = result.localized_advice()?;
        Some(Narration {
            text: Arc::from(text),
            language_code: language_code.to_string(),
            english: result.english_advice_for_display().map(Arc::from),
        })
    }

    /// Speak the narration. Failures and timeouts are logged and absorbed:
    /// a scan without audio is still a successful scan.
    pub async fn synthesize(&self, narration: &Narration) -> Option<SpeechOutput> {
        let tts = self.tts.as_ref()?;
        let request = TtsRequest::new(narration.text(), narration.speech_language());

        match tokio::time::timeout(self.timeout, tts.synthesize(request)).await {
            Ok(Ok(output)) => {
                info!(provider = tts.name(), lang = narration.speech_language(), "Narration synthesized");
                Some(output)
            }
            Ok(Err(err)) => {
                warn!(provider = tts.name(), error = %err, "Speech synthesis failed; continuing without audio");
                None
            }
            Err(_) => {
                warn!(
                    provider = tts.name(),
                    after_secs = self.timeout.as_secs(),
                    "Speech synthesis timed out; continuing without audio"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTts;
    use serde_json::json;

    fn medicine(advice: &str, advice_en: &str) -> ScanResult {
        ScanResult::Medicine(
            serde_json::from_value(json!({
                "medicine_name": "Paracetamol",
                "advice": advice,
                "advice_en": advice_en
            }))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn speaks_advice_verbatim() {
        let advice = "  खाने के बाद लें।  दिन में दो बार। ";
        let result = medicine(advice, "Take after food. Twice a day.");
        let narration = NarrationComposer::compose(&result, "hi").unwrap();
        assert_eq!(narration.text(), advice);

        let mock = Arc::new(MockTts::new(&b"ID3"[..]));
        let composer = NarrationComposer::new(Some(mock.clone()), Duration::from_secs(1));
        let output = composer.synthesize(&narration).await.unwrap();
        assert!(matches!(output, SpeechOutput::Inline { mime_type: "audio/mpeg", .. }));

        let sent = mock.requests();
        assert_eq!(sent[0].text, advice);
        assert_eq!(sent[0].language_code, "hi");
    }

    #[test]
    fn english_kept_only_when_different() {
        let same = NarrationComposer::compose(&medicine("Rest well.", "Rest well."), "en").unwrap();
        assert_eq!(same.english_for_display(), None);

        let differs = NarrationComposer::compose(&medicine("आराम करें।", "Rest well."), "hi").unwrap();
        assert_eq!(differs.english_for_display(), Some("Rest well."));
    }

    #[test]
    fn nothing_to_narrate() {
        assert!(NarrationComposer::compose(&ScanResult::fallback("raw"), "en").is_none());
        assert!(NarrationComposer::compose(&medicine("", "x"), "en").is_none());
    }

    #[test]
    fn unsupported_language_speaks_english() {
        let n = NarrationComposer::compose(&medicine("Rest.", ""), "fr").unwrap();
        assert_eq!(n.speech_language(), "en");
    }

    #[tokio::test]
    async fn failures_are_absorbed() {
        let narration = NarrationComposer::compose(&medicine("Rest.", ""), "en").unwrap();

        let failing = NarrationComposer::new(Some(Arc::new(MockTts::failing())), Duration::from_secs(1));
        assert!(failing.synthesize(&narration).await.is_none());

        let hanging = NarrationComposer::new(Some(Arc::new(MockTts::hanging())), Duration::from_millis(20));
        assert!(hanging.synthesize(&narration).await.is_none());

        let disabled = NarrationComposer::new(None, Duration::from_secs(1));
        assert!(disabled.synthesize(&narration).await.is_none());
    }
}
