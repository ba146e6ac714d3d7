use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use aigov_engine::{GovernanceAssessment, Mention};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct MetricsSnapshotItem {
    pub ice: f64,
    pub gap: f64,
    pub cpi: f64,
    pub cognitive_stability: f64,
    pub compliance_score: f64,
    pub mention_rate: f64,
    pub insufficient_data: bool,
    pub calculated_at: DateTime<Utc>,
}

impl From<aigov_db::MetricsSnapshotRow> for MetricsSnapshotItem {
    fn from(row: aigov_db::MetricsSnapshotRow) -> Self {
        Self {
            ice: row.ice,
            gap: row.gap,
            cpi: row.cpi,
            cognitive_stability: row.cognitive_stability,
            compliance_score: row.compliance_score,
            mention_rate: row.mention_rate,
            insufficient_data: row.insufficient_data,
            calculated_at: row.calculated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MetricsSummaryItem {
    pub brand_name: String,
    pub brand_slug: String,
    pub ice: f64,
    pub gap: f64,
    pub cpi: f64,
    pub cognitive_stability: f64,
    pub compliance_score: f64,
    pub insufficient_data: bool,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<i64>,
}

pub(super) async fn get_latest_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<MetricsSnapshotItem>>, ApiError> {
    let brand = lookup_brand(&state, &req_id, &slug).await?;

    let row = aigov_db::get_latest_metrics_by_brand(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                "no metrics computed for this brand yet",
            )
        })?;

    Ok(Json(ApiResponse {
        data: MetricsSnapshotItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_metrics_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<MetricsSnapshotItem>>>, ApiError> {
    let brand = lookup_brand(&state, &req_id, &slug).await?;

    let rows =
        aigov_db::list_metrics_snapshots(&state.pool, brand.id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(MetricsSnapshotItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Recompute governance metrics for one brand on demand.
///
/// Fetches the mention window, prior snapshot, and CPI override; runs the
/// engine; persists the new snapshot (append-only); returns the full
/// assessment so the dashboard can render findings and recommendations
/// without a second round trip.
pub(super) async fn recompute_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<GovernanceAssessment>>, ApiError> {
    let brand = lookup_brand(&state, &req_id, &slug).await?;

    let since = Utc::now() - Duration::days(state.metrics_window_days);
    let mentions: Vec<Mention> = aigov_db::list_mentions_since(&state.pool, brand.id, since)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .into_iter()
        .map(aigov_db::MentionRow::into_mention)
        .collect();

    let prior = aigov_db::get_latest_metrics_by_brand(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .map(aigov_db::MetricsSnapshotRow::into_snapshot);

    let cpi_override = aigov_db::get_latest_cpi_score(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let assessment =
        aigov_engine::evaluate_brand(&mentions, prior.as_ref(), cpi_override, brand.id, Utc::now());

    aigov_db::insert_metrics_snapshot(&state.pool, &assessment.snapshot)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(
        brand = %slug,
        compliance = assessment.snapshot.compliance_score,
        findings = assessment.findings.len(),
        "metrics recomputed"
    );

    Ok(Json(ApiResponse {
        data: assessment,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_metrics_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<MetricsSummaryItem>>>, ApiError> {
    let rows = aigov_db::list_metrics_summary(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| MetricsSummaryItem {
            brand_name: row.brand_name,
            brand_slug: row.brand_slug,
            ice: row.ice,
            gap: row.gap,
            cpi: row.cpi,
            cognitive_stability: row.cognitive_stability,
            compliance_score: row.compliance_score,
            insufficient_data: row.insufficient_data,
            calculated_at: row.calculated_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

async fn lookup_brand(
    state: &AppState,
    req_id: &RequestId,
    slug: &str,
) -> Result<aigov_db::BrandRow, ApiError> {
    aigov_db::get_brand_by_slug(&state.pool, slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "brand not found"))
}
