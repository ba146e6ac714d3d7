//! Database operations for the `cpi_scores` table.
//!
//! Some deployments source CPI from an independent upstream scoring
//! pipeline. When a row exists here, its latest score overrides the
//! locally computed CPI; the engine receives it as an explicit parameter
//! so the precedence rule stays visible at every call site.

use sqlx::PgPool;

use crate::DbError;

/// Return the latest authoritative CPI score for a brand, or `None` if
/// this deployment has no upstream CPI source for it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_cpi_score(pool: &PgPool, brand_id: i64) -> Result<Option<f64>, DbError> {
    let score: Option<f64> = sqlx::query_scalar(
        "SELECT score \
         FROM cpi_scores \
         WHERE brand_id = $1 \
         ORDER BY scored_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(brand_id)
    .fetch_optional(pool)
    .await?;

    Ok(score)
}
