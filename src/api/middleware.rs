//! API Middleware (Session Gate, Login Rate Limiting, Logging)

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::handlers::AppState;
use crate::core::access::{self, GateDecision};
use crate::core::auth::{token_from_headers, SessionClaims};
use crate::models::AppError;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 10,
            window_duration: Duration::from_secs(60),
        }
    }
}

/// In-memory fixed-window rate limiter, keyed by client
pub struct RateLimiter {
    /// Request counts per client key
    requests: DashMap<String, (u32, Instant)>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: DashMap::new(),
            config,
        }
    }

    pub fn per_minute(requests: u32) -> Self {
        Self::new(RateLimitConfig {
            requests_per_window: requests,
            window_duration: Duration::from_secs(60),
        })
    }

    /// Check if request is allowed, returns (allowed, remaining, reset_seconds)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        // Reset window if expired
        if now.duration_since(entry.1) > self.config.window_duration {
            entry.0 = 0;
            entry.1 = now;
        }

        let remaining = self.config.requests_per_window.saturating_sub(entry.0);
        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if remaining == 0 {
            return (false, 0, reset_secs);
        }

        entry.0 += 1;
        (true, remaining - 1, reset_secs)
    }

    /// Drop stale entries; returns how many were removed
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        self.requests.retain(|_, (_, started)| {
            now.duration_since(*started) < self.config.window_duration * 2
        });
        before - self.requests.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Periodically purge stale rate-limit entries
pub fn start_cleanup_task(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = limiter.cleanup();
            if removed > 0 {
                debug!("🧹 Rate limiter cleanup: {} stale clients removed", removed);
            }
        }
    })
}

/// Client key for rate limiting: proxy headers, else "unknown"
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Login rate limiting middleware
pub async fn login_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(request.headers());
    let (allowed, remaining, reset) = state.login_limiter.check(&key);

    if !allowed {
        warn!(key = %key, "Login rate limit exceeded");
        let mut response = AppError::rate_limited(reset).into_response();
        response.headers_mut().insert("Retry-After", reset.into());
        return response;
    }

    let mut response = next.run(request).await;

    // Add rate limit headers
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", remaining.into());
    headers.insert("X-RateLimit-Reset", reset.into());

    response
}

// ============================================
// Session gate
// ============================================

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"))
}

/// Route gate: decodes the session (if any) into request extensions, then
/// applies the prefix rules. Browsers get redirects, API clients get JSON.
pub async fn session_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let claims = token_from_headers(request.headers()).and_then(|token| {
        state
            .sessions
            .verify(token)
            .map_err(|e| debug!(path = %path, error = %e, "Session token rejected"))
            .ok()
    });

    let decision = access::gate(&path, claims.as_ref().map(|c| c.role));
    let html = wants_html(request.headers());

    match decision {
        GateDecision::Allow => {
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        GateDecision::Unauthenticated if html => Redirect::to("/login").into_response(),
        GateDecision::Unauthenticated => AppError::unauthorized().into_response(),
        GateDecision::Forbidden => {
            warn!(path = %path, "Route gate denied role");
            if html {
                Redirect::to("/dashboard").into_response()
            } else {
                AppError::forbidden("Unauthorized").into_response()
            }
        }
    }
}

/// Authenticated caller. Rejects with 401 when no valid session exists
/// or the session's user has been deleted.
#[derive(Debug, Clone)]
pub struct Session(pub SessionClaims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let claims = match parts.extensions.get::<SessionClaims>() {
            Some(claims) => claims.clone(),
            None => {
                let token =
                    token_from_headers(&parts.headers).ok_or_else(AppError::unauthorized)?;
                state.sessions.verify(token)?
            }
        };

        // Token tetap valid sampai expired, user-nya bisa sudah dihapus
        if state.store.find_user(&claims.id)?.is_none() {
            debug!(user_id = %claims.id, "Session user no longer exists");
            return Err(AppError::unauthorized());
        }

        Ok(Session(claims))
    }
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}
