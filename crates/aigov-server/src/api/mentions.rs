use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct MentionItem {
    pub provider: String,
    pub query: String,
    pub mentioned: bool,
    pub confidence: f64,
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MentionsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_brand_mentions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<MentionsQuery>,
) -> Result<Json<ApiResponse<Vec<MentionItem>>>, ApiError> {
    let brand = aigov_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "brand not found"))?;

    let rows = aigov_db::list_recent_mentions(&state.pool, brand.id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| MentionItem {
            provider: row.provider,
            query: row.query,
            mentioned: row.mentioned,
            confidence: row.confidence,
            collected_at: row.collected_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
