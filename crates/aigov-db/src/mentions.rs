//! Database operations for the `mentions` table.
//!
//! The engine treats this table as read-only; rows are written by the
//! external collection jobs (or test/CLI seeding).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use aigov_core::Provider;
use aigov_engine::Mention;

use crate::DbError;

/// A row from the `mentions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MentionRow {
    pub id: i64,
    pub brand_id: i64,
    pub provider: String,
    pub query: String,
    pub mentioned: bool,
    pub confidence: f64,
    pub collected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl MentionRow {
    /// Convert into the engine's input type. Unknown provider strings map
    /// to [`Provider::Other`]; they never fail the computation.
    #[must_use]
    pub fn into_mention(self) -> Mention {
        let provider: Provider = self.provider.parse().unwrap_or(Provider::Other);
        Mention {
            brand_id: self.brand_id,
            provider,
            query: self.query,
            mentioned: self.mentioned,
            confidence: self.confidence,
            collected_at: self.collected_at,
        }
    }
}

/// A mention observation to insert.
#[derive(Debug, Clone)]
pub struct NewMention {
    pub brand_id: i64,
    pub provider: Provider,
    pub query: String,
    pub mentioned: bool,
    pub confidence: f64,
    pub collected_at: DateTime<Utc>,
}

/// Insert one mention observation and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_mention(pool: &PgPool, mention: &NewMention) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO mentions \
             (brand_id, provider, query, mentioned, confidence, collected_at) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(mention.brand_id)
    .bind(mention.provider.as_str())
    .bind(&mention.query)
    .bind(mention.mentioned)
    .bind(mention.confidence)
    .bind(mention.collected_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetch the mention window for one brand: every row collected at or after
/// `since`. Date filtering happens here, not in the engine.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_mentions_since(
    pool: &PgPool,
    brand_id: i64,
    since: DateTime<Utc>,
) -> Result<Vec<MentionRow>, DbError> {
    let rows = sqlx::query_as::<_, MentionRow>(
        "SELECT id, brand_id, provider, query, mentioned, confidence, collected_at, created_at \
         FROM mentions \
         WHERE brand_id = $1 AND collected_at >= $2 \
         ORDER BY collected_at DESC, id DESC",
    )
    .bind(brand_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// List recent mention rows for one brand, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_mentions(
    pool: &PgPool,
    brand_id: i64,
    limit: i64,
) -> Result<Vec<MentionRow>, DbError> {
    let rows = sqlx::query_as::<_, MentionRow>(
        "SELECT id, brand_id, provider, query, mentioned, confidence, collected_at, created_at \
         FROM mentions \
         WHERE brand_id = $1 \
         ORDER BY collected_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(brand_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
