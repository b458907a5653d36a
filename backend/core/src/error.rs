use std::fmt;

use thiserror::Error;

/// Pipeline stage, used to label timeouts and upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Vision model reading the photographed image.
    TextExtraction,
    /// Text model structuring the extracted text.
    Analysis,
    /// Speech synthesis of the narration.
    Narration,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::TextExtraction => write!(f, "text_extraction"),
            Stage::Analysis => write!(f, "analysis"),
            Stage::Narration => write!(f, "narration"),
        }
    }
}

/// Top-level error type for a scan.
///
/// A structured-parse failure is deliberately absent: it degrades into a
/// fallback record and the scan still succeeds.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("image too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("upstream error ({provider}){}: {message}", status_suffix(.status))]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("upstream unreachable ({provider}): {message}")]
    Unreachable { provider: String, message: String },

    #[error("{stage} timed out after {after_secs}s")]
    Timeout { stage: Stage, after_secs: u64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" status {s}")).unwrap_or_default()
}

impl ScanError {
    pub fn upstream(provider: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Failures that happened between us and a model or speech provider.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Unreachable { .. } | Self::Timeout { .. }
        )
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Timeouts are transport errors but are never retried: the per-call
    /// bound is the whole allowance.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unreachable { .. } => true,
            Self::Upstream { status: Some(s), .. } => matches!(s, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Short machine-readable kind for API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput(_) => "missing_input",
            Self::InvalidInput(_) => "invalid_input",
            Self::TooLarge { .. } => "invalid_input",
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::Upstream { .. } => "upstream",
            Self::Unreachable { .. } => "unreachable",
            Self::Timeout { .. } => "timeout",
            Self::Storage(_) => "storage",
            Self::Other(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(ScanError::upstream("groq", Some(429), "slow down").is_retryable());
        assert!(ScanError::upstream("groq", Some(503), "busy").is_retryable());
        assert!(!ScanError::upstream("groq", Some(401), "bad key").is_retryable());
        assert!(!ScanError::upstream("groq", None, "garbled").is_retryable());
    }

    #[test]
    fn timeout_is_transport_but_not_retryable() {
        let err = ScanError::Timeout {
            stage: Stage::TextExtraction,
            after_secs: 120,
        };
        assert!(err.is_transport());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "text_extraction timed out after 120s");
    }

    #[test]
    fn configuration_is_not_transport() {
        let err = ScanError::MissingConfiguration("vision api key".into());
        assert!(!err.is_transport());
        assert_eq!(err.kind(), "missing_configuration");
    }

    #[test]
    fn upstream_display_includes_status() {
        let err = ScanError::upstream("gemini", Some(500), "boom");
        assert_eq!(err.to_string(), "upstream error (gemini) status 500: boom");
    }
}
