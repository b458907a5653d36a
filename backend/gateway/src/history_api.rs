//! History endpoints.
//!
//! Deletes answer the same way whether or not the record still existed, so
//! a repeated delete is indistinguishable from the first. Spooled narration
//! audio goes with the record.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use sanjeevani_core::{ScanError, ScanId, ScanRecord};
use sanjeevani_history::{DeleteOutcome, ScanLifecycle, HISTORY_PAGE_LIMIT};

use crate::error::ApiError;
use crate::server::AppState;

/// Listing limit that reaches every record of an owner.
const ALL_RECORDS: usize = i64::MAX as usize;

fn parse_scan_id(raw: &str) -> Result<ScanId, ScanError> {
    raw.parse()
        .map_err(|_| ScanError::InvalidInput(format!("'{raw}' is not a scan id")))
}

async fn remove_audio(state: &AppState, records: &[ScanRecord]) -> usize {
    let store = state.pipeline.audio_store();
    let mut removed = 0;
    for audio in records.iter().filter_map(|r| r.audio.as_ref()) {
        if store.remove(audio).await {
            removed += 1;
        }
    }
    removed
}

async fn deleted(state: &AppState, record: Option<ScanRecord>, id: ScanId, outcome: DeleteOutcome) -> Json<Value> {
    if outcome == DeleteOutcome::Deleted {
        let mut lifecycle = ScanLifecycle::persisted(id);
        match lifecycle.delete() {
            Ok(()) => info!(scan_id = %id, "Scan deleted"),
            Err(err) => warn!(error = %err, "Unexpected lifecycle state on delete"),
        }
        if let Some(record) = record {
            remove_audio(state, std::slice::from_ref(&record)).await;
        }
    }
    Json(json!({ "success": true, "id": id }))
}

/// `GET /api/history/:user_id`
pub async fn list_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let history = state.history.get_by_owner(&user_id, HISTORY_PAGE_LIMIT).await?;
    Ok(Json(json!({ "success": true, "history": history })))
}

/// `DELETE /api/history/:user_id/:scan_id`
pub async fn delete_owned_scan(
    State(state): State<AppState>,
    Path((user_id, scan_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    let record = state.history.get_by_id(id).await?;
    let outcome = state.history.delete_owned(&user_id, id).await?;
    Ok(deleted(&state, record, id, outcome).await)
}

/// `DELETE /api/history/scan/:scan_id`
pub async fn delete_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_scan_id(&scan_id)?;
    let record = state.history.get_by_id(id).await?;
    let outcome = state.history.delete_by_id(id).await?;
    Ok(deleted(&state, record, id, outcome).await)
}

/// `DELETE /api/history/:user_id`
pub async fn delete_owner_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let records = state.history.get_by_owner(&user_id, ALL_RECORDS).await?;
    let removed = state.history.delete_by_owner(&user_id).await?;
    let audio_removed = remove_audio(&state, &records).await;
    info!(owner = %user_id, removed, audio_removed, "Owner history cleared");
    Ok(Json(json!({ "success": true, "removed": removed })))
}
