//! Sanjeevani HTTP gateway.
//!
//! Routes:
//! - `POST   /api/analyze/:scan_type`         run a scan (multipart)
//! - `GET    /api/history/:user_id`           an owner's scans, newest first
//! - `DELETE /api/history/:user_id/:scan_id`  owner-scoped delete
//! - `DELETE /api/history/scan/:scan_id`      delete by id
//! - `DELETE /api/history/:user_id`           delete all of an owner's scans
//! - `GET    /api/audio/:filename`            spooled narration audio
//! - `GET    /api/health`                     liveness and provider wiring

pub mod analyze_api;
pub mod error;
pub mod health_api;
pub mod history_api;
pub mod rate_limit;
pub mod server;

pub use error::ApiError;
pub use rate_limit::RateLimiter;
pub use server::{build_router, spawn_audio_sweeper, start_server, AppState};
