pub mod gemini;
pub mod mock;
pub mod openai_compat;

use std::sync::Arc;

use sanjeevani_config::{ModelProviderConfig, ModelProviderKind};
use sanjeevani_core::LlmProvider;

pub use gemini::GeminiProvider;
pub use mock::{MockProvider, MockReply};
pub use openai_compat::OpenAiCompatProvider;

/// Per-stage model parameters carried on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&ModelProviderConfig> for ModelSettings {
    fn from(config: &ModelProviderConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Build the provider a config section describes.
///
/// A missing key still yields a provider; it reports itself unconfigured and
/// every call fails with `MissingConfiguration`.
pub fn build_provider(config: &ModelProviderConfig) -> Arc<dyn LlmProvider> {
    let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
    match config.kind {
        ModelProviderKind::OpenaiCompat => {
            let mut provider = OpenAiCompatProvider::new(api_key);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        }
        ModelProviderKind::Gemini => {
            let mut provider = GeminiProvider::new(api_key);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanjeevani_config::ProvidersConfig;

    #[test]
    fn groq_defaults_build_openai_compat() {
        let mut config = ProvidersConfig::default().vision;
        let provider = build_provider(&config);
        assert_eq!(provider.name(), "groq");
        assert!(!provider.is_configured());

        config.api_key = Some("gsk_test".into());
        assert!(build_provider(&config).is_configured());
    }

    #[test]
    fn gemini_kind() {
        let config = ModelProviderConfig {
            kind: ModelProviderKind::Gemini,
            api_key: Some("AIza-test".into()),
            base_url: None,
            model: "gemini-2.0-flash".into(),
            temperature: 0.1,
            max_tokens: 1024,
        };
        assert_eq!(build_provider(&config).name(), "gemini");
    }
}
