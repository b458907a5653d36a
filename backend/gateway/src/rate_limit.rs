//! Per-client fixed-window rate limiting for the analyze routes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Tracked clients before expired windows are swept on the next request.
const PRUNE_THRESHOLD: usize = 1024;

/// Fixed-window request counter keyed by client address.
#[derive(Clone)]
pub struct RateLimiter {
    // client -> (request_count, window_start)
    limits: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    pub max_requests: u32,
    pub window: Duration,
    /// Key clients by the first `X-Forwarded-For` hop instead of the peer.
    pub trust_forwarded_for: bool,
    prune_threshold: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(30, 60)
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            limits: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
            trust_forwarded_for: false,
            prune_threshold: PRUNE_THRESHOLD,
        }
    }

    pub fn trusting_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Count a request from `client` and report whether it may proceed.
    pub async fn check_limit(&self, client: &str) -> bool {
        let mut limits = self.limits.write().await;
        let now = Instant::now();

        if limits.len() >= self.prune_threshold && !limits.contains_key(client) {
            let before = limits.len();
            retain_live(&mut limits, now, self.window);
            debug!(removed = before - limits.len(), "Expired rate limit windows pruned");
        }

        let state = limits.entry(client.to_string()).or_insert((0, now));

        if now.duration_since(state.1) > self.window {
            state.0 = 1;
            state.1 = now;
            debug!(client, "Rate limit window reset");
            true
        } else {
            state.0 += 1;
            if state.0 > self.max_requests {
                warn!(client, limit = self.max_requests, "Rate limit exceeded");
                false
            } else {
                true
            }
        }
    }

    pub async fn tracked_clients(&self) -> usize {
        self.limits.read().await.len()
    }
}

fn retain_live(limits: &mut HashMap<String, (u32, Instant)>, now: Instant, window: Duration) {
    limits.retain(|_, (_, start)| now.duration_since(*start) <= window);
}

/// Client identity: the peer address, or the first `X-Forwarded-For` hop
/// when the server sits behind a trusted proxy.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    trust_forwarded_for
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting over-limit clients with 429.
pub async fn enforce(
    State(limiter): State<RateLimiter>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(
        request.headers(),
        peer.map(|ConnectInfo(addr)| addr),
        limiter.trust_forwarded_for,
    );
    if !limiter.check_limit(&client).await {
        let body = json!({
            "error": "Too many scans; please wait a minute and try again.",
            "kind": "rate_limited",
            "retryable": true,
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }
    next.run(request).await
}
