//! `POST /api/analyze/:scan_type`

use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use sanjeevani_core::{ScanError, ScanId, ScanRequest, ScanResult, ScanType};
use sanjeevani_pipeline::ScanOutcome;

use crate::error::ApiError;
use crate::server::AppState;

/// Successful analyze response. `data` is the record itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: ScanResult,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_embedded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<ScanId>,
}

impl From<ScanOutcome> for AnalyzeResponse {
    fn from(outcome: ScanOutcome) -> Self {
        let (audio_embedded, audio_url) = match &outcome.audio {
            Some(audio) => (audio.embedded().map(str::to_string), audio.url().map(str::to_string)),
            None => (None, None),
        };
        Self {
            success: true,
            data: outcome.result,
            language: outcome.language_code,
            audio_embedded,
            audio_url,
            scan_id: outcome.scan_id,
        }
    }
}

/// Fields pulled out of the multipart body.
#[derive(Debug, Default)]
struct AnalyzeForm {
    image: Option<(Vec<u8>, Option<String>)>,
    language: Option<String>,
    user_id: Option<String>,
}

async fn field_text(field: Field<'_>) -> Result<String, ScanError> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| ScanError::InvalidInput(e.body_text()))
}

async fn read_form(mut multipart: Multipart, max_image_bytes: usize) -> Result<AnalyzeForm, ScanError> {
    let mut form = AnalyzeForm::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if e.status().as_u16() == 413 => {
                return Err(ScanError::TooLarge {
                    size: max_image_bytes + 1,
                    limit: max_image_bytes,
                })
            }
            Err(e) => return Err(ScanError::InvalidInput(e.body_text())),
        };
        match field.name().unwrap_or_default() {
            "image" => {
                let mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ScanError::InvalidInput(e.body_text()))?;
                form.image = Some((bytes.to_vec(), mime));
            }
            "language" => form.language = Some(field_text(field).await?),
            "user_id" | "userId" => form.user_id = Some(field_text(field).await?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(form)
}

/// Run one scan from an uploaded photo.
pub async fn analyze(
    State(state): State<AppState>,
    Path(scan_type): Path<String>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let scan_type: ScanType = scan_type.parse()?;
    let form = read_form(multipart, state.pipeline.max_image_bytes()).await?;

    let (image_bytes, mime_type) = form
        .image
        .ok_or_else(|| ScanError::MissingInput("no image uploaded".into()))?;
    let language_code = form
        .language
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "en".to_string());
    let user_id = form.user_id.filter(|u| !u.is_empty());

    info!(
        scan_type = %scan_type,
        language = %language_code,
        bytes = image_bytes.len(),
        owner = user_id.is_some(),
        "Analyze request"
    );

    let outcome = state
        .pipeline
        .run(ScanRequest {
            image_bytes,
            mime_type,
            scan_type,
            language_code,
            user_id,
        })
        .await?;

    Ok(Json(outcome.into()))
}
