//! Sanjeevani service configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional in
//! the file; missing sections take the defaults below.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub limits: LimitsConfig,
    pub timeouts: TimeoutsConfig,
    pub retry: RetryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Analyze requests allowed per client per minute.
    pub rate_limit_per_minute: u32,
    /// Key rate limits by `X-Forwarded-For`; only safe behind a proxy that sets it.
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            rate_limit_per_minute: 30,
            trust_forwarded_for: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelProviderKind {
    /// Any OpenAI-style `/chat/completions` endpoint (Groq, OpenAI, OpenRouter).
    #[default]
    OpenaiCompat,
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelProviderConfig {
    #[serde(default)]
    pub kind: ModelProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

impl ModelProviderConfig {
    fn groq(model: &str) -> Self {
        Self {
            kind: ModelProviderKind::OpenaiCompat,
            api_key: None,
            base_url: Some(GROQ_BASE_URL.to_string()),
            model: model.to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProviderKind {
    /// Keyless Google Translate speech endpoint.
    #[default]
    GoogleTranslate,
    Openai,
    Disabled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechConfig {
    pub kind: SpeechProviderKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    /// Stage 1: image → raw text.
    pub vision: ModelProviderConfig,
    /// Stage 2: raw text → JSON record.
    pub text: ModelProviderConfig,
    pub speech: SpeechConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            vision: ModelProviderConfig::groq("meta-llama/llama-4-scout-17b-16e-instruct"),
            text: ModelProviderConfig::groq("llama-3.3-70b-versatile"),
            speech: SpeechConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Limits, timeouts, retry
// ---------------------------------------------------------------------------

pub const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitsConfig {
    pub max_image_bytes: usize,
    /// Audio at or below this size is returned inline as a data URI.
    pub max_embedded_audio_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * MIB,
            max_embedded_audio_bytes: 2 * MIB,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeoutsConfig {
    pub medicine_ocr_secs: u64,
    /// Handwriting takes markedly longer to read.
    pub prescription_ocr_secs: u64,
    pub analysis_secs: u64,
    pub speech_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            medicine_ocr_secs: 45,
            prescription_ocr_secs: 120,
            analysis_secs: 60,
            speech_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Total attempts per upstream call, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 8_000,
            jitter: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage + logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// SQLite history database; `:memory:` keeps history for the process lifetime only.
    pub db_path: String,
    /// Spool directory for audio too large to embed.
    pub audio_dir: String,
    /// How long spooled audio of unsaved scans is kept.
    pub transient_audio_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "sanjeevani.db".to_string(),
            audio_dir: "audio".to_string(),
            transient_audio_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling NDJSON logs; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: ServiceConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.limits.max_image_bytes, 10 * MIB);
    }

    #[test]
    fn prescription_ocr_gets_longer_allowance() {
        let t = TimeoutsConfig::default();
        assert!(t.prescription_ocr_secs > t.medicine_ocr_secs);
    }

    #[test]
    fn partial_provider_section() {
        let yaml = r#"
providers:
  text:
    kind: gemini
    model: gemini-2.0-flash
    apiKey: abc
"#;
        let config: ServiceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.providers.text.kind, ModelProviderKind::Gemini);
        assert!(config.providers.text.has_api_key());
        assert_eq!(config.providers.text.temperature, 0.1);
        // untouched section keeps its default
        assert_eq!(config.providers.vision.base_url.as_deref(), Some(GROQ_BASE_URL));
    }
}
