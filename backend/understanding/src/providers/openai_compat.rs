use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sanjeevani_core::{LlmProvider, LlmRequest, LlmResponse, ScanError};
use sanjeevani_logging::truncate_for_log;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Any OpenAI-style `/chat/completions` endpoint (Groq by default).
pub struct OpenAiCompatProvider {
    client: Client,
    name: String,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            name: "groq".to_string(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at another compatible endpoint. The provider name follows the host.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self.name = provider_name_for(&self.base_url).to_string();
        self
    }
}

fn provider_name_for(base_url: &str) -> &'static str {
    if base_url.contains("groq.com") {
        "groq"
    } else if base_url.contains("openrouter.ai") {
        "openrouter"
    } else if base_url.contains("openai.com") {
        "openai"
    } else {
        "openai_compat"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn build_body(request: &LlmRequest) -> ChatRequest<'_> {
    let mut messages = Vec::new();
    if !request.system_prompt.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: MessageContent::Text(&request.system_prompt),
        });
    }

    let user_content = match &request.image {
        Some(image) => MessageContent::Parts(vec![
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: image.data_uri() },
            },
            ContentPart::Text { text: &request.user_prompt },
        ]),
        None => MessageContent::Text(&request.user_prompt),
    };
    messages.push(ChatMessage {
        role: "user",
        content: user_content,
    });

    ChatRequest {
        model: &request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        response_format: request.json_mode.then_some(ResponseFormat { kind: "json_object" }),
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ScanError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScanError::MissingConfiguration(format!("{} api key", self.name)))?;
        let start = Instant::now();

        debug!(
            provider = %self.name,
            model = %request.model,
            with_image = request.image.is_some(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| ScanError::Unreachable {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ScanError::upstream(
                &self.name,
                Some(status.as_u16()),
                truncate_for_log(&error_body, 300),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScanError::upstream(&self.name, None, format!("malformed response: {e}")))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let tokens_used = chat_response.usage.and_then(|u| u.total_tokens).unwrap_or(0);

        Ok(LlmResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanjeevani_core::EncodedImage;

    fn request(image: Option<EncodedImage>, json_mode: bool) -> LlmRequest {
        LlmRequest {
            model: "llama-3.3-70b-versatile".into(),
            system_prompt: "sys".into(),
            user_prompt: "read this".into(),
            image,
            max_tokens: 256,
            temperature: 0.1,
            json_mode,
        }
    }

    #[test]
    fn vision_body_uses_content_parts() {
        let image = EncodedImage {
            mime_type: "image/png".into(),
            base64: "AAAA".into(),
        };
        let req = request(Some(image), false);
        let body = serde_json::to_value(build_body(&req)).unwrap();
        let parts = &body["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "image_url");
        assert_eq!(parts[0]["image_url"]["url"], "data:image/png;base64,AAAA");
        assert_eq!(parts[1]["type"], "text");
        assert_eq!(parts[1]["text"], "read this");
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn json_mode_sets_response_format() {
        let req = request(None, true);
        let body = serde_json::to_value(build_body(&req)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "read this");
    }

    #[tokio::test]
    async fn missing_key_is_configuration_error() {
        let provider = OpenAiCompatProvider::new(None);
        let err = provider.complete(&request(None, false)).await.unwrap_err();
        assert!(matches!(err, ScanError::MissingConfiguration(_)));
    }

    #[test]
    fn name_follows_base_url() {
        let p = OpenAiCompatProvider::new(None).with_base_url("https://openrouter.ai/api/v1/");
        assert_eq!(p.name(), "openrouter");
        assert_eq!(p.base_url, "https://openrouter.ai/api/v1");
    }
}
