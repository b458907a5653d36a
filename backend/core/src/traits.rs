use async_trait::async_trait;

use crate::error::ScanError;

/// An image prepared for transmission to a vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Standard base64 of the image bytes.
    pub base64: String,
}

impl EncodedImage {
    /// Self-describing `data:` URI form, as accepted by OpenAI-style APIs.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Trait for chat-completion style model providers.
///
/// The same contract serves both pipeline hops: Stage 1 attaches an image,
/// Stage 2 sends text only.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "groq", "gemini").
    fn name(&self) -> &str;

    /// Whether credentials are wired up. Checked before every call so that a
    /// missing key is reported as configuration, never as transport.
    fn is_configured(&self) -> bool {
        true
    }

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ScanError>;
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: Option<EncodedImage>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON-object response where supported.
    pub json_mode: bool,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}
