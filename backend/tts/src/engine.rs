/// TTS provider trait and implementations (Google Translate + OpenAI TTS).
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use sanjeevani_config::{SpeechConfig, SpeechProviderKind};
use sanjeevani_core::ScanError;
use sanjeevani_logging::truncate_for_log;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Every provider is asked for MP3.
pub const SPEECH_MIME_TYPE: &str = "audio/mpeg";

/// A TTS request. `text` is spoken exactly as given.
#[derive(Debug, Clone)]
pub struct TtsRequest {
    pub text: String,
    /// ISO 639-1 code of the voice language.
    pub language_code: String,
    pub voice: Option<String>,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_code: language_code.into(),
            voice: None,
        }
    }
}

/// What a speech provider hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutput {
    Inline { bytes: Bytes, mime_type: &'static str },
    /// Already hosted somewhere the client can fetch.
    Remote { url: String },
}

#[async_trait]
pub trait TtsProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn synthesize(&self, req: TtsRequest) -> Result<SpeechOutput, ScanError>;
}

fn unreachable(provider: &str, err: reqwest::Error) -> ScanError {
    ScanError::Unreachable {
        provider: provider.to_string(),
        message: err.without_url().to_string(),
    }
}

async fn read_audio(provider: &str, response: reqwest::Response) -> Result<Bytes, ScanError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScanError::upstream(provider, Some(status.as_u16()), truncate_for_log(&body, 200)));
    }
    response.bytes().await.map_err(|e| unreachable(provider, e))
}

// ---------------------------------------------------------------------------
// Google Translate TTS
// ---------------------------------------------------------------------------

/// Longest text the translate endpoint accepts per request.
const GOOGLE_CHUNK_CHARS: usize = 200;

/// Keyless Google Translate speech endpoint. Long text is split into
/// chunks and the MP3 responses are concatenated in order.
pub struct GoogleTranslateTts {
    client: Client,
    base_url: String,
}

impl GoogleTranslateTts {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://translate.google.com/translate_tts".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn chunk_url(&self, chunk: &str, lang: &str, idx: usize, total: usize) -> String {
        format!(
            "{}?ie=UTF-8&client=tw-ob&tl={}&q={}&total={}&idx={}&textlen={}",
            self.base_url,
            urlencoding::encode(lang),
            urlencoding::encode(chunk),
            total,
            idx,
            chunk.chars().count()
        )
    }
}

impl Default for GoogleTranslateTts {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into pieces of at most `max_chars` characters, preferring
/// sentence ends (including the danda `।`), then spaces. Concatenating the
/// pieces with single spaces gives back the text modulo whitespace runs.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_string());
            break;
        }
        // byte index just past the max_chars-th char
        let limit = rest.char_indices().nth(max_chars).map(|(i, _)| i).unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = window
            .rmatch_indices(|c: char| matches!(c, '.' | '!' | '?' | '।' | '\n'))
            .next()
            .map(|(i, m)| i + m.len())
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        rest = rest[cut..].trim_start();
    }
    chunks
}

#[async_trait]
impl TtsProvider for GoogleTranslateTts {
    fn name(&self) -> &str {
        "google_translate"
    }

    async fn synthesize(&self, req: TtsRequest) -> Result<SpeechOutput, ScanError> {
        let chunks = split_for_speech(&req.text, GOOGLE_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ScanError::InvalidInput("nothing to speak".into()));
        }
        info!(lang = %req.language_code, chunks = chunks.len(), "[TTS/Google] Synthesizing");

        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let response = self
                .client
                .get(self.chunk_url(chunk, &req.language_code, idx, chunks.len()))
                .header("User-Agent", "Mozilla/5.0")
                .send()
                .await
                .map_err(|e| unreachable(self.name(), e))?;
            audio.extend_from_slice(&read_audio(self.name(), response).await?);
        }
        debug!(bytes = audio.len(), "[TTS/Google] Done");

        Ok(SpeechOutput::Inline {
            bytes: audio.freeze(),
            mime_type: SPEECH_MIME_TYPE,
        })
    }
}

// ---------------------------------------------------------------------------
// OpenAI TTS
// ---------------------------------------------------------------------------

pub struct OpenAiTts {
    api_key: String,
    model: String,
    default_voice: String,
    client: Client,
}

impl OpenAiTts {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "tts-1".to_string(),
            default_voice: "nova".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }
}

#[derive(Serialize)]
struct OpenAiTtsBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

#[async_trait]
impl TtsProvider for OpenAiTts {
    fn name(&self) -> &str {
        "openai"
    }

    async fn synthesize(&self, req: TtsRequest) -> Result<SpeechOutput, ScanError> {
        // The model detects the language from the text itself.
        let body = OpenAiTtsBody {
            model: &self.model,
            input: &req.text,
            voice: req.voice.as_deref().unwrap_or(&self.default_voice),
            response_format: "mp3",
        };
        info!("[TTS/OpenAI] Synthesizing with model={}", body.model);
        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| unreachable(self.name(), e))?;

        Ok(SpeechOutput::Inline {
            bytes: read_audio(self.name(), response).await?,
            mime_type: SPEECH_MIME_TYPE,
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build the configured speech provider.
///
/// `Ok(None)` means speech is switched off; a selected provider without its
/// key is a configuration error.
pub fn create_tts(config: &SpeechConfig) -> Result<Option<Arc<dyn TtsProvider>>, ScanError> {
    match config.kind {
        SpeechProviderKind::Disabled => Ok(None),
        SpeechProviderKind::GoogleTranslate => {
            let tts: Arc<dyn TtsProvider> = Arc::new(GoogleTranslateTts::new());
            Ok(Some(tts))
        }
        SpeechProviderKind::Openai => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ScanError::MissingConfiguration("openai speech api key".into()))?;
            let mut tts = OpenAiTts::new(api_key);
            if let Some(model) = &config.model {
                tts = tts.with_model(model.clone());
            }
            if let Some(voice) = &config.voice {
                tts = tts.with_voice(voice.clone());
            }
            let tts: Arc<dyn TtsProvider> = Arc::new(tts);
            Ok(Some(tts))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_for_speech("  Take after food.  ", 200), vec!["Take after food."]);
        assert!(split_for_speech("   ", 200).is_empty());
    }

    #[test]
    fn splits_on_sentences_then_words() {
        let text = "Take one tablet. Drink water often";
        assert_eq!(split_for_speech(text, 20), vec!["Take one tablet.", "Drink water often"]);
        assert_eq!(split_for_speech("alpha beta gamma", 11), vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn splits_on_danda_and_respects_char_limit() {
        let text = "खाने के बाद लें। दिन में दो बार।";
        let chunks = split_for_speech(text, 16);
        assert_eq!(chunks, vec!["खाने के बाद लें।", "दिन में दो बार।"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    }

    #[test]
    fn unbroken_text_is_hard_cut() {
        let chunks = split_for_speech("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn chunk_url_encodes_text() {
        let tts = GoogleTranslateTts::new();
        let url = tts.chunk_url("दवा लें", "hi", 0, 1);
        assert!(url.starts_with("https://translate.google.com/translate_tts?ie=UTF-8&client=tw-ob&tl=hi&q="));
        assert!(url.contains("%E0%A4%A6"));
        assert!(url.ends_with("&total=1&idx=0&textlen=7"));
    }

    #[test]
    fn factory_respects_kind() {
        let mut config = SpeechConfig::default();
        assert_eq!(create_tts(&config).unwrap().unwrap().name(), "google_translate");

        config.kind = SpeechProviderKind::Disabled;
        assert!(create_tts(&config).unwrap().is_none());

        config.kind = SpeechProviderKind::Openai;
        assert!(matches!(create_tts(&config), Err(ScanError::MissingConfiguration(_))));
    }
}
