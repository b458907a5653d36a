//! Stage 2: raw text → JSON completion in the requested language.

use std::sync::Arc;
use std::time::Duration;

use sanjeevani_core::{Language, LlmProvider, LlmRequest, ScanError, ScanType, Stage};
use sanjeevani_logging::truncate_for_log;
use tracing::{debug, info};

use crate::prompts::{analysis_system_prompt, analysis_user_prompt};
use crate::providers::ModelSettings;
use crate::retry::{retry_async, RetryPolicy};

pub struct StructuredAnalyzer {
    provider: Arc<dyn LlmProvider>,
    settings: ModelSettings,
    timeout: Duration,
    retry: RetryPolicy,
}

impl StructuredAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: ModelSettings, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            provider,
            settings,
            timeout,
            retry,
        }
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// The exact request sent upstream for this input.
    pub fn build_request(&self, extracted_text: &str, scan_type: ScanType, language_code: &str) -> LlmRequest {
        let language = Language::resolve(language_code);
        LlmRequest {
            model: self.settings.model.clone(),
            system_prompt: analysis_system_prompt(scan_type, language),
            user_prompt: analysis_user_prompt(scan_type, extracted_text),
            image: None,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            json_mode: true,
        }
    }

    pub fn ensure_configured(&self) -> Result<(), ScanError> {
        if self.provider.is_configured() {
            return Ok(());
        }
        Err(ScanError::MissingConfiguration(format!(
            "text provider '{}' has no api key",
            self.provider.name()
        )))
    }

    /// Ask the text model for the record. Every failure propagates.
    pub async fn analyze(
        &self,
        extracted_text: &str,
        scan_type: ScanType,
        language_code: &str,
    ) -> Result<String, ScanError> {
        self.ensure_configured()?;

        let request = self.build_request(extracted_text, scan_type, language_code);
        let limit = self.timeout;
        let provider = &self.provider;
        let request = &request;

        let response = retry_async(&self.retry, "analysis", || async move {
            match tokio::time::timeout(limit, provider.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout {
                    stage: Stage::Analysis,
                    after_secs: limit.as_secs(),
                }),
            }
        })
        .await?;

        info!(
            scan_type = %scan_type,
            language = language_code,
            provider = %response.provider,
            latency_ms = response.latency_ms,
            tokens = response.tokens_used,
            "Stage 2 complete"
        );
        debug!(preview = %truncate_for_log(&response.content, 200), "Stage 2 completion");
        Ok(response.content)
    }
}
