//! Multi-provider governance metrics engine.
//!
//! Turns a window of per-provider mention observations into the four
//! governance indices (ICE, GAP, CPI, Cognitive Stability), an overall
//! compliance score, typed risk findings, and prioritized recommendations.
//!
//! The engine is pure and synchronous: no I/O, no shared state, one
//! bounded computation per call. Fetching mentions and prior snapshots,
//! and persisting results, belong to the callers (server, scheduler, CLI).

pub mod aggregate;
pub mod indices;
pub mod recommend;
pub mod risk;
pub mod stats;
pub mod types;

use chrono::{DateTime, Utc};

pub use aggregate::aggregate;
pub use indices::compute;
pub use recommend::recommend;
pub use risk::detect;
pub use types::{
    GovernanceAssessment, Mention, MetricsSnapshot, Priority, ProviderAggregate, Recommendation,
    RiskFinding, RiskLevel,
};

/// Run the full governance pipeline for one brand.
///
/// 1. Group the mention window by provider.
/// 2. Compute the four indices and the compliance score.
/// 3. Detect risk conditions against the fixed threshold table.
/// 4. Evaluate the recommendation rules table.
///
/// `prior` is the brand's most recent persisted snapshot (`None` = no
/// history), `cpi_override` the authoritative upstream CPI when one exists.
/// The caller supplies `now` so identical inputs yield identical output —
/// recomputation is idempotent and safe to run concurrently per brand.
#[must_use]
pub fn evaluate_brand(
    mentions: &[Mention],
    prior: Option<&MetricsSnapshot>,
    cpi_override: Option<f64>,
    brand_id: i64,
    now: DateTime<Utc>,
) -> GovernanceAssessment {
    let aggregates = aggregate(mentions);
    let snapshot = compute(&aggregates, prior, cpi_override, brand_id, now);
    let findings = detect(&snapshot, &aggregates, now);
    let recommendations = recommend(&snapshot);

    GovernanceAssessment {
        snapshot,
        findings,
        recommendations,
    }
}
