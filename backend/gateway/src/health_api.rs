//! Gateway Health API

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ProviderReport {
    pub vision: &'static str,
    pub text: &'static str,
    pub speech: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub providers: ProviderReport,
}

fn wiring(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "missing_configuration"
    }
}

/// Handler for `GET /api/health`.
///
/// Always 200 while the process is up; unwired providers show up in the body.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    let providers = state.pipeline.provider_health();
    Json(HealthReport {
        status: "ok",
        service: "sanjeevani",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        providers: ProviderReport {
            vision: wiring(providers.vision),
            text: wiring(providers.text),
            speech: if providers.speech { "configured" } else { "disabled" },
        },
    })
}
