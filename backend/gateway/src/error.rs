//! Mapping of scan errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sanjeevani_core::ScanError;
use serde_json::json;
use tracing::{error, warn};

/// A [`ScanError`] on its way out of a handler.
///
/// Body shape: `{ "error": message, "kind": kind, "retryable": bool }`.
#[derive(Debug)]
pub struct ApiError(pub ScanError);

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ScanError::MissingInput(_) | ScanError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScanError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ScanError::MissingConfiguration(_) => StatusCode::SERVICE_UNAVAILABLE,
            ScanError::Upstream { .. } | ScanError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            ScanError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ScanError::Storage(_) | ScanError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let err = self.0;
        if status.is_server_error() {
            error!(kind = err.kind(), error = %err, "Request failed");
        } else {
            warn!(kind = err.kind(), error = %err, "Request rejected");
        }

        let body = json!({
            "error": err.to_string(),
            "kind": err.kind(),
            "retryable": err.is_transport(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanjeevani_core::Stage;

    #[test]
    fn status_per_error_kind() {
        let cases = [
            (ScanError::MissingInput("image".into()), StatusCode::BAD_REQUEST),
            (ScanError::TooLarge { size: 11, limit: 10 }, StatusCode::PAYLOAD_TOO_LARGE),
            (
                ScanError::MissingConfiguration("text api key".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ScanError::upstream("groq", Some(429), "slow down"), StatusCode::BAD_GATEWAY),
            (
                ScanError::Timeout {
                    stage: Stage::Analysis,
                    after_secs: 60,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (ScanError::Storage("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
