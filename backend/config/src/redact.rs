//! Config redaction: safe-to-print snapshots with credentials masked.

use serde_json::Value;

const SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "token", "secret", "password"];

/// Redact a config JSON value, masking every sensitive field.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            // first four chars as a hint
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 4 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_keys() {
        let v = json!({"providers": {"text": {"apiKey": "gsk_live_abcdef", "model": "llama"}}});
        let out = redact(&v);
        assert_eq!(out["providers"]["text"]["apiKey"], "gsk_***");
        assert_eq!(out["providers"]["text"]["model"], "llama");
    }

    #[test]
    fn short_secret_fully_masked() {
        let out = redact(&json!({"token": "abc"}));
        assert_eq!(out["token"], "***");
    }
}
