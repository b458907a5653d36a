use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use sanjeevani_config::ServiceConfig;
use sanjeevani_core::{AudioReference, ScanError, ScanId, ScanRecord, ScanRequest, ScanResult, ScanType};
use sanjeevani_history::{HistoryStore, ScanLifecycle};
use sanjeevani_media::{AudioStore, ImageNormalizer};
use sanjeevani_tts::{create_tts, Narration, NarrationComposer, SpeechOutput};
use sanjeevani_understanding::{
    build_provider, parse, postprocess, ExtractionTimeouts, ModelSettings, RetryPolicy, StructuredAnalyzer,
    TextExtractor,
};

/// What a finished scan hands back to the caller.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan_type: ScanType,
    pub language_code: String,
    pub result: ScanResult,
    pub narration: Option<Narration>,
    pub audio: Option<AudioReference>,
    /// Set only when the scan was persisted.
    pub scan_id: Option<ScanId>,
}

/// Whether each upstream provider has credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProviderHealth {
    pub vision: bool,
    pub text: bool,
    pub speech: bool,
}

pub struct ScanPipeline {
    normalizer: ImageNormalizer,
    extractor: TextExtractor,
    analyzer: StructuredAnalyzer,
    composer: NarrationComposer,
    audio: AudioStore,
    history: Arc<dyn HistoryStore>,
}

impl ScanPipeline {
    pub fn new(
        normalizer: ImageNormalizer,
        extractor: TextExtractor,
        analyzer: StructuredAnalyzer,
        composer: NarrationComposer,
        audio: AudioStore,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            normalizer,
            extractor,
            analyzer,
            composer,
            audio,
            history,
        }
    }

    /// Wire every stage from config.
    ///
    /// Missing model keys do not fail here; they fail each scan with
    /// `MissingConfiguration`. A misconfigured speech provider disables audio.
    pub fn from_config(config: &ServiceConfig, history: Arc<dyn HistoryStore>) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        let providers = &config.providers;

        let extractor = TextExtractor::new(
            build_provider(&providers.vision),
            ModelSettings::from(&providers.vision),
            ExtractionTimeouts::from(&config.timeouts),
            retry.clone(),
        );
        let analyzer = StructuredAnalyzer::new(
            build_provider(&providers.text),
            ModelSettings::from(&providers.text),
            Duration::from_secs(config.timeouts.analysis_secs),
            retry,
        );

        let tts = create_tts(&providers.speech).unwrap_or_else(|err| {
            warn!(error = %err, "Speech provider unavailable; scans will have no audio");
            None
        });
        let composer = NarrationComposer::new(tts, Duration::from_secs(config.timeouts.speech_secs));

        Self::new(
            ImageNormalizer::new(config.limits.max_image_bytes),
            extractor,
            analyzer,
            composer,
            AudioStore::new(&config.storage.audio_dir, config.limits.max_embedded_audio_bytes),
            history,
        )
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Spool for narration audio too large to embed.
    pub fn audio_store(&self) -> &AudioStore {
        &self.audio
    }

    pub fn max_image_bytes(&self) -> usize {
        self.normalizer.max_bytes()
    }

    pub fn provider_health(&self) -> ProviderHealth {
        ProviderHealth {
            vision: self.extractor.provider().is_configured(),
            text: self.analyzer.provider().is_configured(),
            speech: self.composer.speech_enabled(),
        }
    }

    /// Run one scan end to end.
    pub async fn run(&self, request: ScanRequest) -> Result<ScanOutcome, ScanError> {
        let mut lifecycle = ScanLifecycle::new(Uuid::new_v4());
        let span = info_span!(
            "scan",
            scan_id = %lifecycle.id(),
            scan_type = %request.scan_type,
            language = %request.language_code
        );
        async move {
            let started = Instant::now();
            let scan_type = request.scan_type;

            let image = self
                .normalizer
                .normalize(&request.image_bytes, request.mime_type.as_deref())?;

            // both stages must be wired up before anything is sent upstream
            self.extractor.ensure_configured()?;
            self.analyzer.ensure_configured()?;

            let text = self.extractor.extract_text(&image, scan_type).await?;
            let completion = self
                .analyzer
                .analyze(&text, scan_type, &request.language_code)
                .await?;

            let mut result = parse(&completion, scan_type);
            postprocess(&mut result, Utc::now().date_naive());

            // advice is frozen from here on
            let narration = NarrationComposer::compose(&result, &request.language_code);
            let owner_id = request.user_id.clone().filter(|u| !u.trim().is_empty());
            let audio = match &narration {
                Some(narration) => self.deliver_audio(narration, owner_id.is_none()).await,
                None => None,
            };

            if let Err(err) = lifecycle.complete() {
                warn!(error = %err, "Unexpected lifecycle state on completion");
            }
            let mut record = ScanRecord::new(
                owner_id,
                scan_type,
                request.language_code.clone(),
                result,
                audio,
            );
            record.id = lifecycle.id();

            let scan_id = match &record.owner_id {
                Some(owner) => match self.history.create(&record).await {
                    Ok(()) => {
                        if let Err(err) = lifecycle.persist() {
                            warn!(error = %err, "Unexpected lifecycle state on persist");
                        }
                        Some(record.id)
                    }
                    Err(err) => {
                        warn!(owner_id = %owner, error = %err, "Could not save scan to history");
                        None
                    }
                },
                None => None,
            };

            info!(
                fallback = record.result.is_fallback(),
                audio = record.audio.is_some(),
                persisted = scan_id.is_some(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Scan complete"
            );

            Ok::<_, ScanError>(ScanOutcome {
                scan_type,
                language_code: record.language_code,
                result: record.result,
                narration,
                audio: record.audio,
                scan_id,
            })
        }
        .instrument(span)
        .await
    }

    async fn deliver_audio(&self, narration: &Narration, transient: bool) -> Option<AudioReference> {
        match self.composer.synthesize(narration).await? {
            SpeechOutput::Remote { url } => Some(AudioReference::Url { url }),
            SpeechOutput::Inline { bytes, mime_type } => match self.audio.store(&bytes, mime_type, transient).await {
                Ok(reference) => Some(reference),
                Err(err) => {
                    warn!(error = %err, "Could not store narration audio");
                    None
                }
            },
        }
    }
}
