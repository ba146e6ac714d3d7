//! HTTP middleware: request IDs, bearer auth, and per-caller rate limits.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer-token auth settings used by [`require_bearer_auth`].
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Builds auth config from `AIGOV_API_KEYS` (comma-separated bearer
    /// tokens).
    ///
    /// In development, empty/missing keys disable auth for local iteration.
    /// In non-development envs, empty/missing keys fail startup.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = parse_keys(&std::env::var("AIGOV_API_KEYS").unwrap_or_default());

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "AIGOV_API_KEYS not set; bearer auth disabled in development environment"
                );
                return Ok(Self::from_keys(HashSet::new()));
            }

            anyhow::bail!(
                "AIGOV_API_KEYS is required outside development; provide comma-separated bearer tokens"
            );
        }

        Ok(Self::from_keys(keys))
    }

    fn from_keys(keys: HashSet<String>) -> Self {
        Self {
            enabled: !keys.is_empty(),
            api_keys: Arc::new(keys),
        }
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

/// Stale buckets are swept once the map grows past this many callers.
const MAX_TRACKED_CALLERS: usize = 4096;

#[derive(Debug)]
struct CallerBucket {
    window_started: Instant,
    reads: usize,
    recomputes: usize,
}

/// Fixed-window rate limiter with one bucket per caller.
///
/// Buckets are keyed by the presented bearer token so one integration
/// cannot starve another. A recomputation runs the whole metrics pipeline
/// plus several queries, so `POST .../metrics/recompute` is charged against
/// a separate, much smaller budget than the read endpoints.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    read_limit: usize,
    recompute_limit: usize,
    window: Duration,
    buckets: Arc<Mutex<HashMap<String, CallerBucket>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(read_limit: usize, recompute_limit: usize, window: Duration) -> Self {
        Self {
            read_limit,
            recompute_limit,
            window,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Charge one request to `caller`'s budget. Returns the refusal message
    /// when the budget for the request class is spent.
    fn try_acquire(&self, caller: &str, is_recompute: bool) -> Result<(), &'static str> {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if buckets.len() > MAX_TRACKED_CALLERS {
            let window = self.window;
            buckets.retain(|_, bucket| bucket.window_started.elapsed() < window);
        }

        let bucket = buckets
            .entry(caller.to_owned())
            .or_insert_with(|| CallerBucket {
                window_started: Instant::now(),
                reads: 0,
                recomputes: 0,
            });

        if bucket.window_started.elapsed() >= self.window {
            bucket.window_started = Instant::now();
            bucket.reads = 0;
            bucket.recomputes = 0;
        }

        if is_recompute {
            if bucket.recomputes >= self.recompute_limit {
                return Err("recompute budget exhausted; retry after the window resets");
            }
            bucket.recomputes += 1;
        } else {
            if bucket.reads >= self.read_limit {
                return Err("rate limit exceeded");
            }
            bucket.reads += 1;
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn error_response(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = match req.headers().get("x-request-id").and_then(|v| v.to_str().ok()) {
        Some(value) => value.to_owned(),
        None => Uuid::new_v4().to_string(),
    };

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware enforcing Bearer token auth when enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match extract_bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware enforcing per-caller request budgets.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let caller = caller_key(req.headers());
    let recompute = is_recompute_request(req.method(), req.uri().path());

    match limiter.try_acquire(&caller, recompute) {
        Ok(()) => next.run(req).await,
        Err(message) => error_response(StatusCode::TOO_MANY_REQUESTS, "rate_limited", message),
    }
}

/// Bucket key for a request: the presented bearer token, or a single shared
/// bucket for unauthenticated traffic (auth disabled in development).
fn caller_key(headers: &HeaderMap) -> String {
    extract_bearer_token(headers.get(AUTHORIZATION))
        .map_or_else(|| "anonymous".to_owned(), ToOwned::to_owned)
}

fn is_recompute_request(method: &Method, path: &str) -> bool {
    method == Method::POST && path.ends_with("/metrics/recompute")
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keys_trims_and_drops_empty_entries() {
        let keys = parse_keys(" key-a , ,key-b,");
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("key-a"));
        assert!(keys.contains("key-b"));
    }

    #[test]
    fn auth_state_allows_only_configured_keys() {
        let state = AuthState::from_keys(parse_keys("key-a,key-b"));
        assert!(state.enabled);
        assert!(state.allows("key-a"));
        assert!(!state.allows("key-c"));
    }

    #[test]
    fn auth_state_disables_when_no_keys_in_dev() {
        std::env::remove_var("AIGOV_API_KEYS");
        let state = AuthState::from_env(true).expect("dev should allow missing keys");
        assert!(!state.enabled);
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
    fn caller_key_uses_token_or_shared_anonymous_bucket() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_key(&headers), "anonymous");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        assert_eq!(caller_key(&headers), "tok-1");
    }

    #[test]
    fn recompute_requests_are_detected_by_method_and_path() {
        let path = "/api/v1/brands/acme-labs/metrics/recompute";
        assert!(is_recompute_request(&Method::POST, path));
        assert!(!is_recompute_request(&Method::GET, path));
        assert!(!is_recompute_request(
            &Method::POST,
            "/api/v1/brands/acme-labs/metrics/history"
        ));
    }

    #[test]
    fn callers_have_independent_budgets() {
        let limiter = RateLimitState::new(2, 1, Duration::from_secs(60));

        assert!(limiter.try_acquire("tok-1", false).is_ok());
        assert!(limiter.try_acquire("tok-1", false).is_ok());
        assert!(limiter.try_acquire("tok-1", false).is_err());

        // A different caller is unaffected.
        assert!(limiter.try_acquire("tok-2", false).is_ok());
    }

    #[test]
    fn recompute_budget_is_separate_and_smaller() {
        let limiter = RateLimitState::new(10, 1, Duration::from_secs(60));

        assert!(limiter.try_acquire("tok-1", true).is_ok());
        let refusal = limiter.try_acquire("tok-1", true).unwrap_err();
        assert!(refusal.contains("recompute"));

        // Spent recompute budget does not block reads.
        assert!(limiter.try_acquire("tok-1", false).is_ok());
    }

    #[test]
    fn budgets_reset_when_the_window_elapses() {
        let limiter = RateLimitState::new(1, 1, Duration::from_millis(10));

        assert!(limiter.try_acquire("tok-1", false).is_ok());
        assert!(limiter.try_acquire("tok-1", false).is_err());

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.try_acquire("tok-1", false).is_ok());
    }
}
