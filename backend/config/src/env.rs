//! Environment handling for config values.
//!
//! Two passes run at load time:
//! - `${VAR_NAME}` references inside string values are substituted
//!   (uppercase `[A-Z_][A-Z0-9_]*` names only; `$${VAR}` escapes to a literal `${VAR}`);
//! - well-known variables override or fill typed fields.

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::{ServiceConfig, SpeechProviderKind};

/// An optional leading `$` (the escape) followed by a `${NAME}` reference.
static ENV_VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("static env var pattern is valid")
});

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config value tree from the process env.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply well-known environment variables on top of a loaded config.
///
/// Explicit `SANJEEVANI_*` variables win over the file. Provider keys from
/// the environment only fill keys the file left empty.
pub fn apply_env_overrides(mut config: ServiceConfig, env: &HashMap<String, String>) -> ServiceConfig {
    let get = |name: &str| env.get(name).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(bind) = get("SANJEEVANI_BIND") {
        config.server.bind_address = bind;
    }
    if let Some(port) = get("SANJEEVANI_PORT").and_then(|p| p.parse().ok()) {
        config.server.port = port;
    }
    if let Some(db) = get("SANJEEVANI_DB") {
        config.storage.db_path = db;
    }
    if let Some(dir) = get("SANJEEVANI_AUDIO_DIR") {
        config.storage.audio_dir = dir;
    }
    if let Some(level) = get("RUST_LOG") {
        config.logging.level = level;
    }

    let model_key = get("GROQ_API_KEY").or_else(|| get("API_KEY"));
    for provider in [&mut config.providers.vision, &mut config.providers.text] {
        if !provider.has_api_key() {
            provider.api_key = model_key.clone();
        }
    }

    let speech = &mut config.providers.speech;
    if speech.kind == SpeechProviderKind::Openai && speech.api_key.is_none() {
        speech.api_key = get("OPENAI_API_KEY");
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"providers": {"text": {"apiKey": "${GROQ_KEY}"}}});
        let out = resolve_env_vars_with(&v, &env(&[("GROQ_KEY", "gsk-123")])).unwrap();
        assert_eq!(out["providers"]["text"]["apiKey"], "gsk-123");
    }

    #[test]
    fn missing_var_names_path() {
        let v = json!({"storage": {"dbPath": "${DATA_DIR}/history.db"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err().to_string();
        assert!(err.contains("DATA_DIR"));
        assert!(err.contains("storage.dbPath"));
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = json!({"note": "$${NOT_A_VAR}"});
        let out = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(out["note"], "${NOT_A_VAR}");
    }

    #[test]
    fn overrides_fill_missing_keys_only() {
        let mut config = ServiceConfig::default();
        config.providers.text.api_key = Some("from-file".into());

        let config = apply_env_overrides(
            config,
            &env(&[("API_KEY", "from-env"), ("SANJEEVANI_PORT", "8088")]),
        );
        assert_eq!(config.providers.vision.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.providers.text.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.server.port, 8088);
    }

    #[test]
    fn bad_port_is_ignored() {
        let config = apply_env_overrides(ServiceConfig::default(), &env(&[("SANJEEVANI_PORT", "http")]));
        assert_eq!(config.server.port, 5000);
    }
}
