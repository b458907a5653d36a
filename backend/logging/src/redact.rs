//! Log Redaction
//!
//! Scrubs API keys, bearer tokens, and phone numbers from strings prior to
//! logging. Model output is never logged whole; see [`truncate_for_log`].

use once_cell::sync::Lazy;
use regex::Regex;

static TELEPHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("valid phone pattern")
});
static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9]{32,})|(gsk_[a-zA-Z0-9]{20,})|(AIza[0-9A-Za-z\-_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)")
        .expect("valid key pattern")
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TELEPHONE_RE.replace_all(input, "[REDACTED_PHONE]");
    API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]").into_owned()
}

/// Redacted prefix of at most `max_chars` characters, with an ellipsis when cut.
pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let clean = redact_sensitive_data(input);
    if clean.chars().count() <= max_chars {
        return clean;
    }
    let mut cut: String = clean.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "Calling +91-555-123-4567 with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("555-123-4567"));
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn groq_keys_are_scrubbed() {
        let clean = redact_sensitive_data("key=gsk_abcdefghijklmnopqrstuvwx");
        assert_eq!(clean, "key=[REDACTED_TOKEN]");
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_for_log("दवा दवा", 3), "दवा…");
        assert_eq!(truncate_for_log("short", 10), "short");
    }
}
