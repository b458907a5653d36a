//! Stage 1: photo → raw text.

use std::sync::Arc;
use std::time::Duration;

use sanjeevani_config::TimeoutsConfig;
use sanjeevani_core::{EncodedImage, LlmProvider, LlmRequest, ScanError, ScanType, Stage};
use tracing::{debug, info, warn};

use crate::prompts::reading_prompt;
use crate::providers::ModelSettings;
use crate::retry::{retry_async, RetryPolicy};

/// Per-attempt bound on the vision call, by scan type.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionTimeouts {
    pub medicine: Duration,
    pub prescription: Duration,
}

impl ExtractionTimeouts {
    pub fn for_scan(&self, scan_type: ScanType) -> Duration {
        match scan_type {
            ScanType::Medicine => self.medicine,
            ScanType::Prescription => self.prescription,
        }
    }
}

impl From<&TimeoutsConfig> for ExtractionTimeouts {
    fn from(config: &TimeoutsConfig) -> Self {
        Self {
            medicine: Duration::from_secs(config.medicine_ocr_secs),
            prescription: Duration::from_secs(config.prescription_ocr_secs),
        }
    }
}

pub struct TextExtractor {
    provider: Arc<dyn LlmProvider>,
    settings: ModelSettings,
    timeouts: ExtractionTimeouts,
    retry: RetryPolicy,
}

impl TextExtractor {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        settings: ModelSettings,
        timeouts: ExtractionTimeouts,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            settings,
            timeouts,
            retry,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn request(&self, image: &EncodedImage, scan_type: ScanType) -> LlmRequest {
        LlmRequest {
            model: self.settings.model.clone(),
            system_prompt: String::new(),
            user_prompt: reading_prompt(scan_type).to_string(),
            image: Some(image.clone()),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            json_mode: false,
        }
    }

    pub fn ensure_configured(&self) -> Result<(), ScanError> {
        if self.provider.is_configured() {
            return Ok(());
        }
        Err(ScanError::MissingConfiguration(format!(
            "vision provider '{}' has no api key",
            self.provider.name()
        )))
    }

    /// Read the image into raw text.
    ///
    /// Upstream failures and empty replies yield an empty string so Stage 2
    /// can still produce a best-effort result. Two outcomes do propagate: a
    /// missing key, and a timeout, which must not pass for an empty read.
    pub async fn extract_text(&self, image: &EncodedImage, scan_type: ScanType) -> Result<String, ScanError> {
        self.ensure_configured()?;

        let request = self.request(image, scan_type);
        let limit = self.timeouts.for_scan(scan_type);
        let provider = &self.provider;
        let request = &request;

        let outcome = retry_async(&self.retry, "text_extraction", || async move {
            match tokio::time::timeout(limit, provider.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout {
                    stage: Stage::TextExtraction,
                    after_secs: limit.as_secs(),
                }),
            }
        })
        .await;

        match outcome {
            Ok(response) => {
                let text = response.content.trim().to_string();
                info!(
                    scan_type = %scan_type,
                    provider = %response.provider,
                    latency_ms = response.latency_ms,
                    chars = text.chars().count(),
                    "Stage 1 complete"
                );
                if text.is_empty() {
                    debug!(scan_type = %scan_type, "Vision model returned no text");
                }
                Ok(text)
            }
            Err(err @ (ScanError::Timeout { .. } | ScanError::MissingConfiguration(_))) => Err(err),
            Err(err) => {
                warn!(scan_type = %scan_type, error = %err, "Stage 1 failed; continuing with empty text");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockProvider, MockReply};

    fn image() -> EncodedImage {
        EncodedImage {
            mime_type: "image/jpeg".into(),
            base64: "/9j/4AAQ".into(),
        }
    }

    fn settings() -> ModelSettings {
        ModelSettings {
            model: "vision-model".into(),
            temperature: 0.1,
            max_tokens: 512,
        }
    }

    fn timeouts(ms: u64) -> ExtractionTimeouts {
        ExtractionTimeouts {
            medicine: Duration::from_millis(ms),
            prescription: Duration::from_millis(ms * 4),
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            base_delay_ms: 1,
            jitter: false,
            ..Default::default()
        }
    }

    fn extractor(provider: Arc<MockProvider>, ms: u64) -> TextExtractor {
        TextExtractor::new(provider, settings(), timeouts(ms), fast_retry())
    }

    #[tokio::test]
    async fn sends_image_with_reading_prompt() {
        let mock = Arc::new(MockProvider::new("vision").with_response("  Crocin Advance\nParacetamol 500mg \n"));
        let text = extractor(mock.clone(), 1_000)
            .extract_text(&image(), ScanType::Prescription)
            .await
            .unwrap();
        assert_eq!(text, "Crocin Advance\nParacetamol 500mg");

        let sent = &mock.requests()[0];
        assert_eq!(sent.image.as_ref(), Some(&image()));
        assert_eq!(sent.user_prompt, reading_prompt(ScanType::Prescription));
        assert!(!sent.json_mode);
    }

    #[tokio::test]
    async fn upstream_failure_becomes_empty_text() {
        let mock = Arc::new(MockProvider::new("vision").with_script([MockReply::Status(400)]));
        let text = extractor(mock, 1_000).extract_text(&image(), ScanType::Medicine).await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let mock = Arc::new(
            MockProvider::new("vision")
                .with_script([MockReply::Unreachable, MockReply::Text("Dolo 650".into())]),
        );
        let text = extractor(mock.clone(), 1_000)
            .extract_text(&image(), ScanType::Medicine)
            .await
            .unwrap();
        assert_eq!(text, "Dolo 650");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn timeout_propagates() {
        let mock = Arc::new(MockProvider::new("vision").with_script([MockReply::Hang]));
        let err = extractor(mock.clone(), 20)
            .extract_text(&image(), ScanType::Medicine)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Timeout { stage: Stage::TextExtraction, .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_key_propagates() {
        let mock = Arc::new(MockProvider::new("vision").unconfigured());
        let err = extractor(mock, 1_000).extract_text(&image(), ScanType::Medicine).await.unwrap_err();
        assert!(matches!(err, ScanError::MissingConfiguration(_)));
    }

    #[test]
    fn prescription_gets_longer_allowance() {
        let t = ExtractionTimeouts::from(&TimeoutsConfig::default());
        assert!(t.for_scan(ScanType::Prescription) > t.for_scan(ScanType::Medicine));
    }
}
