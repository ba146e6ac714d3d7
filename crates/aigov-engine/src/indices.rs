//! Index Calculator: turns per-provider aggregates (plus prior history)
//! into the four governance indices and the overall compliance score.

use std::collections::HashMap;

use aigov_core::Provider;
use chrono::{DateTime, Utc};

use crate::stats::{clamp_index, mean, stddev};
use crate::types::{MetricsSnapshot, ProviderAggregate};

/// Fixed CPI composite weights. Not configurable; the weights are part of
/// the metric's definition.
pub const CPI_WEIGHT_ICE: f64 = 0.4;
pub const CPI_WEIGHT_GAP: f64 = 0.3;
pub const CPI_WEIGHT_STABILITY: f64 = 0.3;

/// Minimum alignment tolerance for GAP, in mention-rate percentage points.
///
/// Alignment is nominally "within one standard deviation of the mean", but
/// for a tightly clustered set the standard deviation shrinks below
/// measurement noise and no cluster could ever count as fully aligned. The
/// floor makes agreement-within-noise count as agreement.
pub const ALIGNMENT_TOLERANCE_MIN: f64 = 5.0;

/// Compute a [`MetricsSnapshot`] from one window's aggregates.
///
/// `prior` is the immediately preceding snapshot for the brand, if any —
/// the sole input to Cognitive Stability. `cpi_override` is the
/// authoritative upstream CPI when a deployment sources CPI from an
/// independent scoring pipeline; when present it replaces the locally
/// computed composite both in the stored CPI and in the compliance average.
///
/// Empty aggregates yield the all-zero insufficient-data snapshot. All
/// outputs are clamped to [0, 100]; no NaN escapes.
#[must_use]
pub fn compute(
    aggregates: &HashMap<Provider, ProviderAggregate>,
    prior: Option<&MetricsSnapshot>,
    cpi_override: Option<f64>,
    brand_id: i64,
    now: DateTime<Utc>,
) -> MetricsSnapshot {
    if aggregates.is_empty() {
        return MetricsSnapshot::insufficient(brand_id, now);
    }

    let rates: Vec<f64> = aggregates
        .values()
        .map(ProviderAggregate::mention_rate)
        .collect();

    let ice = compute_ice(&rates);
    let gap = compute_gap(aggregates, &rates);
    let mention_rate = overall_mention_rate(aggregates);
    let cognitive_stability = compute_stability(mention_rate, prior);

    let computed_cpi = clamp_index(
        CPI_WEIGHT_ICE * ice + CPI_WEIGHT_GAP * gap + CPI_WEIGHT_STABILITY * cognitive_stability,
    );
    let cpi = match cpi_override {
        Some(value) => clamp_index(value),
        None => computed_cpi,
    };

    let compliance_score = clamp_index((ice + gap + cognitive_stability + cpi) / 4.0);

    MetricsSnapshot {
        brand_id,
        ice,
        gap,
        cpi,
        cognitive_stability,
        compliance_score,
        mention_rate,
        insufficient_data: false,
        calculated_at: now,
    }
}

/// ICE: consensus strength across providers.
///
/// With fewer than two providers there is no basis for disagreement, so ICE
/// is 100 by policy.
fn compute_ice(rates: &[f64]) -> f64 {
    if rates.len() < 2 {
        return 100.0;
    }
    clamp_index(100.0 - stddev(rates).min(100.0))
}

/// GAP: weighted share of providers aligned with the consensus.
///
/// A provider is aligned when its mention rate falls within the alignment
/// tolerance of the cross-provider mean; the share is weighted by the mean
/// confidence of the aligned providers.
fn compute_gap(aggregates: &HashMap<Provider, ProviderAggregate>, rates: &[f64]) -> f64 {
    let mean_rate = mean(rates);
    let tolerance = stddev(rates).max(ALIGNMENT_TOLERANCE_MIN);

    let aligned: Vec<&ProviderAggregate> = aggregates
        .values()
        .filter(|agg| (agg.mention_rate() - mean_rate).abs() <= tolerance)
        .collect();

    if aligned.is_empty() {
        return 0.0;
    }

    let aligned_confidences: Vec<f64> = aligned
        .iter()
        .map(|agg| agg.avg_confidence())
        .collect();
    let consensus_factor = mean(&aligned_confidences) / 100.0;

    #[allow(clippy::cast_precision_loss)]
    let share = aligned.len() as f64 / aggregates.len() as f64 * 100.0;

    clamp_index(share * consensus_factor)
}

/// Overall rolling mention rate for the window, in [0, 100].
fn overall_mention_rate(aggregates: &HashMap<Provider, ProviderAggregate>) -> f64 {
    let total: usize = aggregates.values().map(|a| a.total).sum();
    let mentioned: usize = aggregates.values().map(|a| a.mentioned_count).sum();
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = mentioned as f64 / total as f64 * 100.0;
    rate
}

/// Cognitive Stability: inverse of period-over-period mention-rate movement.
///
/// No prior snapshot means no observed instability — the engine must not
/// fabricate a trend, so the result is 100.
fn compute_stability(mention_rate: f64, prior: Option<&MetricsSnapshot>) -> f64 {
    match prior {
        Some(previous) => {
            let delta = (mention_rate - previous.mention_rate).abs();
            clamp_index(100.0 - delta.min(100.0))
        }
        None => 100.0,
    }
}
