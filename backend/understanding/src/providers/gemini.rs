use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sanjeevani_core::{LlmProvider, LlmRequest, LlmResponse, ScanError};
use sanjeevani_logging::truncate_for_log;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

fn build_body(request: &LlmRequest) -> GenerateRequest<'_> {
    let mut parts = Vec::new();
    if let Some(image) = &request.image {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.base64,
            },
        });
    }
    parts.push(Part::Text { text: &request.user_prompt });

    GenerateRequest {
        system_instruction: (!request.system_prompt.is_empty()).then(|| Content {
            parts: vec![Part::Text { text: &request.system_prompt }],
        }),
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            response_mime_type: request.json_mode.then_some("application/json"),
        },
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ScanError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ScanError::MissingConfiguration("gemini api key".into()))?;
        let start = Instant::now();

        debug!(model = %request.model, with_image = request.image.is_some(), "Sending request to Gemini");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, request.model))
            .query(&[("key", api_key)])
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| ScanError::Unreachable {
                provider: "gemini".into(),
                // reqwest errors can echo the URL, which carries the key
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ScanError::upstream(
                "gemini",
                Some(status.as_u16()),
                truncate_for_log(&error_body, 300),
            ));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ScanError::upstream("gemini", None, format!("malformed response: {}", e.without_url())))?;

        let content = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            provider: "gemini".to_string(),
            model: request.model.clone(),
            tokens_used: body.usage_metadata.and_then(|u| u.total_token_count).unwrap_or(0),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
