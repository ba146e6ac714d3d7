//! Database operations for the `metrics_snapshots` table.
//!
//! The table is append-only: snapshots are inserted, never updated in
//! place, and the latest `calculated_at` wins for display.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use aigov_engine::MetricsSnapshot;

use crate::DbError;

/// A row from the `metrics_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricsSnapshotRow {
    pub id: i64,
    pub brand_id: i64,
    pub ice: f64,
    pub gap: f64,
    pub cpi: f64,
    pub cognitive_stability: f64,
    pub compliance_score: f64,
    pub mention_rate: f64,
    pub insufficient_data: bool,
    pub calculated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MetricsSnapshotRow {
    /// Convert into the engine's snapshot type (e.g. to serve as the prior
    /// for the next computation).
    #[must_use]
    pub fn into_snapshot(self) -> MetricsSnapshot {
        MetricsSnapshot {
            brand_id: self.brand_id,
            ice: self.ice,
            gap: self.gap,
            cpi: self.cpi,
            cognitive_stability: self.cognitive_stability,
            compliance_score: self.compliance_score,
            mention_rate: self.mention_rate,
            insufficient_data: self.insufficient_data,
            calculated_at: self.calculated_at,
        }
    }
}

/// Latest snapshot per active brand, for the dashboard summary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MetricsSummaryRow {
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

/// Append a new metrics snapshot and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_metrics_snapshot(
    pool: &PgPool,
    snapshot: &MetricsSnapshot,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO metrics_snapshots \
             (brand_id, ice, gap, cpi, cognitive_stability, compliance_score, \
              mention_rate, insufficient_data, calculated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING id",
    )
    .bind(snapshot.brand_id)
    .bind(snapshot.ice)
    .bind(snapshot.gap)
    .bind(snapshot.cpi)
    .bind(snapshot.cognitive_stability)
    .bind(snapshot.compliance_score)
    .bind(snapshot.mention_rate)
    .bind(snapshot.insufficient_data)
    .bind(snapshot.calculated_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Return the most recent snapshot for a brand, or `None` if no history
/// exists yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_latest_metrics_by_brand(
    pool: &PgPool,
    brand_id: i64,
) -> Result<Option<MetricsSnapshotRow>, DbError> {
    let row = sqlx::query_as::<_, MetricsSnapshotRow>(
        "SELECT id, brand_id, ice, gap, cpi, cognitive_stability, compliance_score, \
                mention_rate, insufficient_data, calculated_at, created_at \
         FROM metrics_snapshots \
         WHERE brand_id = $1 \
         ORDER BY calculated_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(brand_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List snapshot history for a brand, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_metrics_snapshots(
    pool: &PgPool,
    brand_id: i64,
    limit: i64,
) -> Result<Vec<MetricsSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, MetricsSnapshotRow>(
        "SELECT id, brand_id, ice, gap, cpi, cognitive_stability, compliance_score, \
                mention_rate, insufficient_data, calculated_at, created_at \
         FROM metrics_snapshots \
         WHERE brand_id = $1 \
         ORDER BY calculated_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(brand_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Latest snapshot per active brand, ordered by brand name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_metrics_summary(pool: &PgPool) -> Result<Vec<MetricsSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, MetricsSummaryRow>(
        "SELECT b.name AS brand_name, b.slug AS brand_slug, \
                m.ice, m.gap, m.cpi, m.cognitive_stability, m.compliance_score, \
                m.insufficient_data, m.calculated_at \
         FROM brands b \
         JOIN LATERAL ( \
             SELECT * FROM metrics_snapshots \
             WHERE brand_id = b.id \
             ORDER BY calculated_at DESC, id DESC \
             LIMIT 1 \
         ) m ON true \
         WHERE b.is_active = true \
         ORDER BY b.name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
