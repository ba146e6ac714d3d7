//! Seed the `brands` table from the validated `brands.yaml` configuration.

use sqlx::PgPool;

use aigov_core::BrandsFile;

use crate::brands::upsert_brand;
use crate::DbError;

/// Upsert every configured brand. Returns the number of brands processed.
///
/// Existing rows are matched by slug and refreshed; brands removed from the
/// config are left untouched (deactivation is a deliberate operator action,
/// not a seeding side effect).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any upsert fails.
pub async fn seed_brands(pool: &PgPool, brands_file: &BrandsFile) -> Result<usize, DbError> {
    let mut count = 0;

    for brand in &brands_file.brands {
        let slug = brand.slug();
        upsert_brand(pool, &brand.name, &slug, brand.domain.as_deref()).await?;
        tracing::debug!(brand = %slug, "seeded brand");
        count += 1;
    }

    Ok(count)
}
