//! Config validation with field paths in every message.

use thiserror::Error;

use crate::schema::{ModelProviderConfig, ServiceConfig, SpeechProviderKind, MIB};

/// Images beyond this are impractical to send to a vision model.
const PRACTICAL_IMAGE_LIMIT: usize = 20 * MIB;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &ServiceConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.server.port == 0 {
        report.error("server.port", "Port must be non-zero");
    }
    if config.server.rate_limit_per_minute == 0 {
        report.error("server.rateLimitPerMinute", "Rate limit must allow at least one request");
    }

    validate_model("providers.vision", &config.providers.vision, &mut report);
    validate_model("providers.text", &config.providers.text, &mut report);

    let speech = &config.providers.speech;
    if speech.kind == SpeechProviderKind::Openai && speech.api_key.is_none() {
        report.warn("providers.speech.apiKey", "No key; scans will complete without audio");
    }

    let limits = &config.limits;
    if limits.max_image_bytes == 0 {
        report.error("limits.maxImageBytes", "Must be greater than zero");
    } else if limits.max_image_bytes > PRACTICAL_IMAGE_LIMIT {
        report.warn("limits.maxImageBytes", "Above 20 MiB; upstream providers may reject the image");
    }

    let t = &config.timeouts;
    for (path, secs) in [
        ("timeouts.medicineOcrSecs", t.medicine_ocr_secs),
        ("timeouts.prescriptionOcrSecs", t.prescription_ocr_secs),
        ("timeouts.analysisSecs", t.analysis_secs),
        ("timeouts.speechSecs", t.speech_secs),
    ] {
        if secs == 0 {
            report.error(path, "Timeout must be at least one second");
        }
    }
    if t.prescription_ocr_secs < t.medicine_ocr_secs {
        report.warn(
            "timeouts.prescriptionOcrSecs",
            "Handwritten prescriptions usually need more time than medicine labels",
        );
    }

    if config.retry.max_attempts == 0 {
        report.error("retry.maxAttempts", "Must be at least 1 (the first attempt)");
    }
    if config.retry.backoff_factor < 1.0 {
        report.error("retry.backoffFactor", "Must be >= 1.0");
    }

    if config.storage.db_path.trim().is_empty() {
        report.error("storage.dbPath", "Cannot be empty");
    }
    if config.storage.transient_audio_ttl_secs == 0 {
        report.error("storage.transientAudioTtlSecs", "Must be at least one second");
    }

    report
}

fn validate_model(path: &str, provider: &ModelProviderConfig, report: &mut ValidationReport) {
    if provider.model.trim().is_empty() {
        report.error(format!("{path}.model"), "Model cannot be empty");
    }
    if !provider.has_api_key() {
        report.warn(
            format!("{path}.apiKey"),
            "No key; scans will fail with missing_configuration",
        );
    }
    if let Some(url) = &provider.base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error(format!("{path}.baseUrl"), "Must be an http(s) URL");
        }
    }
    if !(0.0..=2.0).contains(&provider.temperature) {
        report.error(format!("{path}.temperature"), "Must be within 0.0..=2.0");
    }
}
