//! `sanjeevani-config`: service configuration management.
//!
//! Provides:
//! - Typed config schema (providers, limits, timeouts, retry, storage, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Well-known env var overrides
//! - Validation with per-field messages
//! - Redaction for safe logging/display

pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_file_path, load_raw, CONFIG_PATH_ENV};
pub use redact::redact;
pub use schema::{
    LimitsConfig, LoggingConfig, ModelProviderConfig, ModelProviderKind, ProvidersConfig,
    RetryConfig, ServerConfig, ServiceConfig, SpeechConfig, SpeechProviderKind, StorageConfig,
    TimeoutsConfig, GROQ_BASE_URL, MIB,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::path::Path;

use anyhow::{bail, Context, Result};

/// A loaded config plus the validation warnings it produced.
///
/// Loading usually happens before logging is set up, so warnings are handed
/// back for the caller to log once a subscriber exists.
#[derive(Debug)]
pub struct PreparedConfig {
    pub config: ServiceConfig,
    pub warnings: Vec<ConfigValidationError>,
}

/// Load, substitute env vars, apply overrides, and validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors fail the load with every message in the error.
pub async fn load_and_prepare(path: &Path) -> Result<PreparedConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    let config: ServiceConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;
    let config = apply_env_overrides(config, &std::env::vars().collect());

    let report = validate(&config);
    if !report.is_valid() {
        let messages: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("{} config error(s):\n  {}", messages.len(), messages.join("\n  "));
    }

    Ok(PreparedConfig {
        config,
        warnings: report.warnings,
    })
}

/// JSON snapshot of the config with credentials masked.
pub fn redacted_snapshot(config: &ServiceConfig) -> serde_json::Value {
    serde_json::to_value(config)
        .map(|v| redact(&v))
        .unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn warnings_are_returned_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sanjeevani.yaml");
        std::fs::write(&path, "timeouts:\n  medicineOcrSecs: 90\n  prescriptionOcrSecs: 30\n").unwrap();

        let prepared = load_and_prepare(&path).await.unwrap();
        assert_eq!(prepared.config.timeouts.medicine_ocr_secs, 90);
        assert!(prepared
            .warnings
            .iter()
            .any(|w| w.path == "timeouts.prescriptionOcrSecs"));
    }

    #[tokio::test]
    async fn every_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sanjeevani.yaml");
        std::fs::write(&path, "retry:\n  maxAttempts: 0\nstorage:\n  dbPath: \"\"\n").unwrap();

        let err = load_and_prepare(&path).await.unwrap_err().to_string();
        assert!(err.starts_with("2 config error(s)"));
        assert!(err.contains("retry.maxAttempts"));
        assert!(err.contains("storage.dbPath"));
    }
}
