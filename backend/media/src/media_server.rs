//! Local audio server: serves spooled narration files over HTTP.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::{path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{debug, warn};

use crate::mime_detect::{detect_mime_type, is_audio};

/// State shared by audio routes.
#[derive(Clone)]
pub struct AudioServerState {
    pub audio_dir: Arc<PathBuf>,
}

/// Build the audio Axum router.
///
/// Mount at `/api/audio`:
///   GET /api/audio/:filename    serve a spooled narration file
pub fn audio_router(audio_dir: PathBuf) -> Router {
    let state = AudioServerState {
        audio_dir: Arc::new(audio_dir),
    };
    Router::new()
        .route("/:filename", get(serve_audio))
        .with_state(state)
}

/// GET /:filename: read a narration file from the spool.
async fn serve_audio(Path(filename): Path<String>, State(state): State<AudioServerState>) -> Response {
    // Basic path sanitization: reject traversal.
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        warn!(filename = %filename, "Rejected suspicious audio path");
        return (StatusCode::BAD_REQUEST, "Invalid filename").into_response();
    }

    let path = state.audio_dir.join(&filename);
    let mime = detect_mime_type(&path);
    if !is_audio(mime) {
        return (StatusCode::NOT_FOUND, "Audio file not found").into_response();
    }

    debug!(path = %path.display(), "Serving audio file");
    match fs::read(&path).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(mime)),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Audio file not found").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read audio file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read audio").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_spooled_mp3() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abc.mp3"), b"ID3data").unwrap();

        let response = get(audio_router(dir.path().to_path_buf()), "/abc.mp3").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ID3data");
    }

    #[tokio::test]
    async fn traversal_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(audio_router(dir.path().to_path_buf()), "/..%2Fsecret.mp3").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(audio_router(dir.path().to_path_buf()), "/nope.mp3").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
