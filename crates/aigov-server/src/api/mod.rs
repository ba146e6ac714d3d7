mod brands;
mod mentions;
mod metrics;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Trailing window, in days, that a recomputation aggregates over.
    pub metrics_window_days: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &aigov_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/brands", get(brands::list_brands))
        .route("/api/v1/brands/{slug}", get(brands::get_brand))
        .route(
            "/api/v1/brands/{slug}/mentions",
            get(mentions::list_brand_mentions),
        )
        .route(
            "/api/v1/brands/{slug}/metrics/latest",
            get(metrics::get_latest_metrics),
        )
        .route(
            "/api/v1/brands/{slug}/metrics/history",
            get(metrics::list_metrics_history),
        )
        .route(
            "/api/v1/brands/{slug}/metrics/recompute",
            post(metrics::recompute_metrics),
        )
        .route("/api/v1/metrics/summary", get(metrics::list_metrics_summary))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match aigov_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

/// Per-caller budgets: 120 reads and 10 recomputations per minute.
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, 10, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::metrics::MetricsSummaryItem;
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    fn test_state(pool: sqlx::PgPool) -> AppState {
        AppState {
            pool,
            metrics_window_days: 30,
        }
    }

    #[test]
    fn metrics_summary_item_is_serializable() {
        // Proves the type compiles and serde works — no DB needed.
        let item = MetricsSummaryItem {
            brand_name: "Acme Labs".to_string(),
            brand_slug: "acme-labs".to_string(),
            ice: 98.7,
            gap: 90.0,
            cpi: 93.1,
            cognitive_stability: 100.0,
            compliance_score: 95.5,
            insufficient_data: false,
            calculated_at: Utc::now(),
        };
        let json = serde_json::to_string(&item).expect("serialize");
        assert!(json.contains("\"brand_slug\":\"acme-labs\""));
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Insert a minimal brand row and return its id.
    async fn seed_brand(pool: &sqlx::PgPool, slug: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO brands (name, slug, is_active) VALUES ($1, $2, true) RETURNING id",
        )
        .bind(format!("Brand {slug}"))
        .bind(slug)
        .fetch_one(pool)
        .await
        .expect("seed_brand failed")
    }

    /// Insert `total` mentions for one provider, `mentioned` of which
    /// reference the brand.
    async fn seed_mentions(
        pool: &sqlx::PgPool,
        brand_id: i64,
        provider: &str,
        total: i32,
        mentioned: i32,
    ) {
        for i in 0..total {
            sqlx::query(
                "INSERT INTO mentions \
                     (brand_id, provider, query, mentioned, confidence, collected_at) \
                 VALUES ($1, $2, $3, $4, 90.0, NOW())",
            )
            .bind(brand_id)
            .bind(provider)
            .bind(format!("query {i}"))
            .bind(i < mentioned)
            .execute(pool)
            .await
            .expect("insert mention");
        }
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_brands_returns_ok(pool: sqlx::PgPool) {
        seed_brand(&pool, "test-brand-list").await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(test_state(pool), auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1, "expected 1 brand");
        assert_eq!(data[0]["slug"].as_str(), Some("test-brand-list"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_brand_returns_404_for_unknown_slug(pool: sqlx::PgPool) {
        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(test_state(pool), auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands/nonexistent-slug-xyz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn recompute_persists_snapshot_and_returns_assessment(pool: sqlx::PgPool) {
        let brand_id = seed_brand(&pool, "recompute-brand").await;
        seed_mentions(&pool, brand_id, "chatgpt", 10, 8).await;
        seed_mentions(&pool, brand_id, "gemini", 10, 8).await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(test_state(pool.clone()), auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/brands/recompute-brand/metrics/recompute")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");

        // Both providers agree at 80% → ICE 100, no findings.
        let snapshot = &json["data"]["snapshot"];
        assert_eq!(snapshot["insufficient_data"].as_bool(), Some(false));
        assert!((snapshot["ice"].as_f64().unwrap() - 100.0).abs() < 1e-9);
        assert!(json["data"]["findings"].as_array().unwrap().is_empty());

        let persisted = aigov_db::get_latest_metrics_by_brand(&pool, brand_id)
            .await
            .expect("latest query")
            .expect("snapshot persisted");
        assert!((persisted.ice - 100.0).abs() < 1e-9);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn recompute_with_no_mentions_reports_insufficient_data(pool: sqlx::PgPool) {
        seed_brand(&pool, "empty-brand").await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(test_state(pool), auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/brands/empty-brand/metrics/recompute")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");

        assert_eq!(
            json["data"]["snapshot"]["insufficient_data"].as_bool(),
            Some(true)
        );
        assert!(json["data"]["findings"].as_array().unwrap().is_empty());
        assert!(json["data"]["recommendations"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn metrics_latest_returns_404_without_history(pool: sqlx::PgPool) {
        seed_brand(&pool, "fresh-brand").await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(test_state(pool), auth, default_rate_limit_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands/fresh-brand/metrics/latest")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn metrics_summary_returns_latest_per_brand(pool: sqlx::PgPool) {
        let brand_id = seed_brand(&pool, "summary-brand").await;
        seed_mentions(&pool, brand_id, "claude", 5, 3).await;

        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        let app = build_app(test_state(pool.clone()), auth, default_rate_limit_state());

        // Recompute once so a snapshot exists.
        let recompute = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/brands/summary-brand/metrics/recompute")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("recompute response");
        assert_eq!(recompute.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/metrics/summary")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["brand_slug"].as_str(), Some("summary-brand"));
    }
}
