//! Database operations for the `brands` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// List all active brands ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_brands(pool: &PgPool) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(
        "SELECT id, name, slug, domain, is_active, created_at \
         FROM brands \
         WHERE is_active = true \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Look up one brand by slug, or `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_by_slug(pool: &PgPool, slug: &str) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(
        "SELECT id, name, slug, domain, is_active, created_at \
         FROM brands \
         WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a brand if its slug is new, otherwise refresh name/domain and
/// reactivate it. Returns the brand id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_brand(
    pool: &PgPool,
    name: &str,
    slug: &str,
    domain: Option<&str>,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO brands (name, slug, domain, is_active) \
         VALUES ($1, $2, $3, true) \
         ON CONFLICT (slug) DO UPDATE \
             SET name = EXCLUDED.name, domain = EXCLUDED.domain, is_active = true \
         RETURNING id",
    )
    .bind(name)
    .bind(slug)
    .bind(domain)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
