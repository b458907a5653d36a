//! Main HTTP server: shared state and routing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, instrument, warn};

use sanjeevani_config::{ServiceConfig, MIB};
use sanjeevani_history::{HistoryStore, SqliteHistoryStore};
use sanjeevani_media::{audio::AUDIO_ROUTE_PREFIX, audio_router};
use sanjeevani_pipeline::ScanPipeline;

use crate::rate_limit::{self, RateLimiter};
use crate::{analyze_api, health_api, history_api};

/// Application state shared across routes.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ScanPipeline>,
    pub history: Arc<dyn HistoryStore>,
    pub limiter: RateLimiter,
    pub audio_dir: PathBuf,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<ScanPipeline>, limiter: RateLimiter, audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            history: pipeline.history().clone(),
            pipeline,
            limiter,
            audio_dir: audio_dir.into(),
            started_at: Instant::now(),
        }
    }

    /// Open storage and wire the pipeline from config.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let history: Arc<dyn HistoryStore> = Arc::new(
            SqliteHistoryStore::from_location(&config.storage.db_path)
                .with_context(|| format!("opening history database {}", config.storage.db_path))?,
        );
        tokio::fs::create_dir_all(&config.storage.audio_dir)
            .await
            .with_context(|| format!("creating audio directory {}", config.storage.audio_dir))?;

        let pipeline = Arc::new(ScanPipeline::from_config(config, history));
        let limiter = RateLimiter::new(config.server.rate_limit_per_minute, 60)
            .trusting_forwarded_for(config.server.trust_forwarded_for);
        Ok(Self::new(pipeline, limiter, &config.storage.audio_dir))
    }
}

/// Build the full router.
pub fn build_router(state: AppState) -> Router {
    // multipart framing on top of the image itself
    let body_limit = state.pipeline.max_image_bytes() + MIB;

    let analyze = Router::new()
        .route("/api/analyze/:scan_type", post(analyze_api::analyze))
        .layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit::enforce))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/api/health", get(health_api::get_health))
        .route(
            "/api/history/:user_id",
            get(history_api::list_history).delete(history_api::delete_owner_history),
        )
        .route("/api/history/scan/:scan_id", delete(history_api::delete_scan))
        .route("/api/history/:user_id/:scan_id", delete(history_api::delete_owned_scan))
        .merge(analyze)
        .with_state(state.clone())
        .nest(AUDIO_ROUTE_PREFIX, audio_router(state.audio_dir))
}

/// Periodically delete spooled audio of unsaved scans older than `ttl`.
pub fn spawn_audio_sweeper(pipeline: Arc<ScanPipeline>, ttl: Duration) -> JoinHandle<()> {
    let every = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = pipeline.audio_store().sweep_transient(ttl).await {
                warn!(error = %err, "Audio sweep failed");
            }
        }
    })
}

/// Bind and serve until the process is stopped.
#[instrument(skip(app))]
pub async fn start_server(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Sanjeevani gateway listening on {}", addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
