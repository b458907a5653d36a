//! Config file loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "SANJEEVANI_CONFIG";

/// Default config file name, looked up in the working directory.
const CONFIG_FILE_NAME: &str = "sanjeevani.yaml";

/// Resolve which config file to read.
/// Priority: explicit path > `SANJEEVANI_CONFIG` > `./sanjeevani.yaml`.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Read the YAML file into an untyped value tree.
///
/// A missing file is not an error: it yields an empty object and every
/// section takes its default.
pub async fn load_raw(path: &Path) -> Result<Value> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_raw(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sanjeevani.yaml");
        std::fs::write(&path, "server:\n  port: 7000\n").unwrap();
        let value = load_raw(&path).await.unwrap();
        assert_eq!(value["server"]["port"], 7000);
    }

    #[test]
    fn explicit_path_wins() {
        let p = config_file_path(Some(Path::new("/etc/sanjeevani.yaml")));
        assert_eq!(p, PathBuf::from("/etc/sanjeevani.yaml"));
    }
}
