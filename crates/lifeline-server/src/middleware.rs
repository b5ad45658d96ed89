use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, RETRY_AFTER},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Per-caller windows are pruned once the map grows past this bound.
const WINDOW_HIGH_WATER: usize = 1024;

/// Request ID carried through extensions so handlers can echo it in
/// response envelopes.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token allowlist for the API surface.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Read the allowlist from `LIFELINE_API_KEYS` (comma-separated tokens).
    ///
    /// A development box may run without keys; auth is then disabled and a
    /// warning logged. Anywhere else, missing keys fail startup.
    ///
    /// # Errors
    ///
    /// Returns an error outside development when no keys are configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = parse_keys(&std::env::var("LIFELINE_API_KEYS").unwrap_or_default());

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "LIFELINE_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    api_keys: Arc::new(HashSet::new()),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "LIFELINE_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self {
            api_keys: Arc::new(keys),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

fn parse_keys(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter with one window per caller.
///
/// Windows are keyed by bearer token so a misbehaving dashboard client
/// cannot starve the rest of the fleet; unauthenticated traffic shares a
/// single anonymous window.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

// Minimal error body for requests rejected before they reach a handler.
// The full response envelope lives in the api module; rejections here
// only need the code and message fields clients match on.
#[derive(Debug, Serialize)]
struct RejectionBody {
    error: RejectionDetail,
}

#[derive(Debug, Serialize)]
struct RejectionDetail {
    code: &'static str,
    message: &'static str,
}

/// Honour an incoming `x-request-id` header or mint a v4 UUID, stash it
/// in extensions as [`RequestId`], and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Reject requests whose bearer token is not on the allowlist. A no-op
/// when auth is disabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let token = extract_bearer_token(req.headers().get(AUTHORIZATION));

    match token {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware enforcing a per-caller request budget per fixed window.
///
/// Emergency dispatch posts are exempt: an SOS press must never bounce
/// off the limiter.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    if req.uri().path().ends_with("/dispatch") {
        return next.run(req).await;
    }

    let caller = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .map_or_else(|| "anonymous".to_owned(), ToOwned::to_owned);

    let mut windows = rate_limit.windows.lock().await;

    if windows.len() > WINDOW_HIGH_WATER {
        let window = rate_limit.window;
        windows.retain(|_, w| w.started_at.elapsed() < window);
    }

    let entry = windows.entry(caller).or_insert_with(|| RateLimitWindow {
        started_at: Instant::now(),
        count: 0,
    });

    if entry.started_at.elapsed() >= rate_limit.window {
        entry.started_at = Instant::now();
        entry.count = 0;
    }

    if entry.count >= rate_limit.max_requests {
        let retry_after = rate_limit.window.saturating_sub(entry.started_at.elapsed());
        drop(windows);
        return rate_limited_response(retry_after);
    }

    entry.count += 1;
    drop(windows);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

fn error_response(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(RejectionBody {
            error: RejectionDetail { code, message },
        }),
    )
        .into_response()
}

fn rate_limited_response(retry_after: Duration) -> Response {
    let mut res = error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "rate limit exceeded",
    );

    if let Ok(val) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
        res.headers_mut().insert(RETRY_AFTER, val);
    }

    res
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::Request,
        middleware::from_fn_with_state,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use super::*;

    async fn pong() -> &'static str {
        "pong"
    }

    fn limited_app(max_requests: usize) -> Router {
        let state = RateLimitState::new(max_requests, Duration::from_secs(60));
        Router::new()
            .route("/api/v1/responders", get(pong))
            .route("/api/v1/dispatch", post(pong))
            .layer(from_fn_with_state(state, enforce_rate_limit))
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn parse_keys_ignores_blank_entries() {
        let keys = parse_keys("alpha, ,beta,,");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("alpha"));
        assert!(keys.contains("beta"));
    }

    #[test]
    fn auth_state_disables_when_no_keys_in_dev() {
        std::env::remove_var("LIFELINE_API_KEYS");
        let state = AuthState::from_env(true).expect("dev should allow missing keys");
        assert!(!state.enabled);
    }

    #[tokio::test]
    async fn rate_limit_windows_are_keyed_by_caller() {
        let app = limited_app(1);

        let first = app
            .clone()
            .oneshot(get_with_token("/api/v1/responders", "ops-a"))
            .await
            .expect("first request");
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(get_with_token("/api/v1/responders", "ops-a"))
            .await
            .expect("second request");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(RETRY_AFTER));

        let other_caller = app
            .oneshot(get_with_token("/api/v1/responders", "ops-b"))
            .await
            .expect("other caller");
        assert_eq!(other_caller.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dispatch_posts_bypass_the_limiter() {
        let app = limited_app(1);

        for _ in 0..3 {
            let res = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/v1/dispatch")
                        .body(Body::empty())
                        .expect("request"),
                )
                .await
                .expect("dispatch request");
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
