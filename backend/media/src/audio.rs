//! Narration audio delivery: inline when small, spooled to disk otherwise.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use base64::Engine;
use sanjeevani_core::{AudioReference, ScanError};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Public path prefix the audio router is mounted under.
pub const AUDIO_ROUTE_PREFIX: &str = "/api/audio";

/// Filename prefix of spools no history record points at.
const TRANSIENT_PREFIX: &str = "tmp-";

pub struct AudioStore {
    dir: PathBuf,
    max_embedded_bytes: usize,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>, max_embedded_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_embedded_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Turn synthesized audio into a reference the client can play.
    ///
    /// Embedding is preferred; only audio above the limit costs a round trip.
    /// `transient` spools belong to unsaved scans and are left to
    /// [`AudioStore::sweep_transient`].
    pub async fn store(&self, bytes: &[u8], mime_type: &str, transient: bool) -> Result<AudioReference, ScanError> {
        if bytes.len() <= self.max_embedded_bytes {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            debug!(size = bytes.len(), "Embedding narration audio");
            return Ok(AudioReference::Embedded {
                data_uri: format!("data:{mime_type};base64,{encoded}"),
            });
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ScanError::Storage(format!("audio dir {}: {e}", self.dir.display())))?;

        let prefix = if transient { TRANSIENT_PREFIX } else { "" };
        let filename = format!("{prefix}{}.{}", Uuid::new_v4(), extension_for(mime_type));
        let path = self.dir.join(&filename);
        fs::write(&path, bytes)
            .await
            .map_err(|e| ScanError::Storage(format!("write {}: {e}", path.display())))?;

        info!(file = %filename, size = bytes.len(), "Spooled narration audio");
        Ok(AudioReference::Url {
            url: format!("{AUDIO_ROUTE_PREFIX}/{filename}"),
        })
    }

    /// Delete the spool file behind `reference`, if it is one of ours.
    /// Returns whether a file was removed.
    pub async fn remove(&self, reference: &AudioReference) -> bool {
        let Some(filename) = reference.url().and_then(spooled_name) else {
            return false;
        };
        let path = self.dir.join(filename);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(file = %filename, "Removed narration audio");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not remove narration audio");
                false
            }
        }
    }

    /// Delete transient spools older than `max_age`. Returns how many went.
    pub async fn sweep_transient(&self, max_age: Duration) -> Result<usize, ScanError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ScanError::Storage(format!("read {}: {e}", self.dir.display()))),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ScanError::Storage(format!("read {}: {e}", self.dir.display())))?
        {
            if !entry.file_name().to_string_lossy().starts_with(TRANSIENT_PREFIX) {
                continue;
            }
            let expired = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .map(|modified| now.duration_since(modified).unwrap_or_default() >= max_age)
                .unwrap_or(false);
            if expired && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "Swept transient narration audio");
        }
        Ok(removed)
    }
}

/// Spool filename behind one of our audio URLs; rejects anything that could
/// leave the spool directory.
fn spooled_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix(AUDIO_ROUTE_PREFIX)?.strip_prefix('/')?;
    let safe = !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\');
    safe.then_some(name)
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/ogg" => "ogg",
        "audio/wav" => "wav",
        _ => "mp3",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn small_audio_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path(), 16);
        let reference = store.store(b"ID3abc", "audio/mpeg", false).await.unwrap();
        assert_eq!(reference.embedded(), Some("data:audio/mpeg;base64,SUQzYWJj"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn large_audio_is_spooled() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("audio"), 4);
        let reference = store.store(b"ID3 longer payload", "audio/mpeg", false).await.unwrap();

        let url = reference.url().unwrap();
        assert!(url.starts_with("/api/audio/"));
        assert!(url.ends_with(".mp3"));

        let filename = url.trim_start_matches("/api/audio/");
        let written = std::fs::read(dir.path().join("audio").join(filename)).unwrap();
        assert_eq!(written, b"ID3 longer payload");
    }

    #[tokio::test]
    async fn remove_deletes_spool_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path(), 0);
        let reference = store.store(b"ID3", "audio/mpeg", false).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        assert!(store.remove(&reference).await);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(!store.remove(&reference).await);
    }

    #[tokio::test]
    async fn remove_ignores_foreign_references() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.mp3"), b"ID3").unwrap();
        let store = AudioStore::new(dir.path().join("audio"), 0);

        let outside = AudioReference::Url { url: "/api/audio/../keep.mp3".into() };
        let remote = AudioReference::Url { url: "https://tts.example/a.mp3".into() };
        let inline = AudioReference::Embedded { data_uri: "data:audio/mpeg;base64,SUQz".into() };
        for reference in [outside, remote, inline] {
            assert!(!store.remove(&reference).await);
        }
        assert!(dir.path().join("keep.mp3").exists());
    }

    #[tokio::test]
    async fn sweep_only_touches_old_transient_spools() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path(), 0);
        let kept = store.store(b"ID3 saved", "audio/mpeg", false).await.unwrap();
        let transient = store.store(b"ID3 anon", "audio/mpeg", true).await.unwrap();
        assert!(transient.url().unwrap().contains("/tmp-"));

        assert_eq!(store.sweep_transient(Duration::from_secs(3600)).await.unwrap(), 0);
        assert_eq!(store.sweep_transient(Duration::ZERO).await.unwrap(), 1);

        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left.len(), 1);
        assert!(kept.url().unwrap().ends_with(&left[0]));
    }

    #[tokio::test]
    async fn sweep_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("never-created"), 0);
        assert_eq!(store.sweep_transient(Duration::ZERO).await.unwrap(), 0);
    }
}
