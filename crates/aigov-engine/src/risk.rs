//! Risk Detector: fixed threshold table over a computed snapshot.

use std::collections::HashMap;

use aigov_core::Provider;
use chrono::{DateTime, Utc};

use crate::types::{MetricsSnapshot, ProviderAggregate, RiskFinding, RiskLevel};

/// Threshold table. Single-sourced here; the presentation layer never
/// carries its own copies of these numbers.
pub const STABILITY_RISK_THRESHOLD: f64 = 70.0;
pub const CPI_RISK_THRESHOLD: f64 = 60.0;
pub const GAP_RISK_THRESHOLD: f64 = 75.0;
pub const DIVERGENCE_RISK_THRESHOLD: f64 = 30.0;

/// Evaluate all risk conditions against a snapshot.
///
/// Conditions are independent and non-exclusive: each triggered condition
/// produces exactly one finding, and several may fire at once. Output
/// order is unspecified; presentation sorts if needed. Insufficient-data
/// snapshots produce no findings — an empty window is "no data yet", not a
/// risk.
#[must_use]
pub fn detect(
    snapshot: &MetricsSnapshot,
    aggregates: &HashMap<Provider, ProviderAggregate>,
    now: DateTime<Utc>,
) -> Vec<RiskFinding> {
    if snapshot.insufficient_data {
        return Vec::new();
    }

    let mut findings = Vec::new();

    if snapshot.cognitive_stability < STABILITY_RISK_THRESHOLD {
        findings.push(RiskFinding {
            level: RiskLevel::High,
            title: "Cognitive instability".to_string(),
            message: format!(
                "Cognitive stability is {:.1}, below the {STABILITY_RISK_THRESHOLD:.0} threshold; \
                 mention behavior shifted sharply since the previous period.",
                snapshot.cognitive_stability
            ),
            metric_value: snapshot.cognitive_stability,
            threshold: STABILITY_RISK_THRESHOLD,
            affected_providers: Vec::new(),
            recommendation_text: "Review recent brand coverage for events that changed how \
                                  providers answer, and recompute after the next collection run."
                .to_string(),
            detected_at: now,
        });
    }

    if snapshot.cpi < CPI_RISK_THRESHOLD {
        findings.push(RiskFinding {
            level: RiskLevel::Medium,
            title: "CPI below threshold".to_string(),
            message: format!(
                "CPI is {:.1}, below the {CPI_RISK_THRESHOLD:.0} threshold.",
                snapshot.cpi
            ),
            metric_value: snapshot.cpi,
            threshold: CPI_RISK_THRESHOLD,
            affected_providers: Vec::new(),
            recommendation_text: "Investigate the weakest underlying index; CPI is a composite \
                                  and moves only when a component does."
                .to_string(),
            detected_at: now,
        });
    }

    if snapshot.gap < GAP_RISK_THRESHOLD {
        findings.push(RiskFinding {
            level: RiskLevel::Medium,
            title: "Governance misalignment".to_string(),
            message: format!(
                "GAP is {:.1}, below the {GAP_RISK_THRESHOLD:.0} threshold; too few providers \
                 agree with the consensus mention rate.",
                snapshot.gap
            ),
            metric_value: snapshot.gap,
            threshold: GAP_RISK_THRESHOLD,
            affected_providers: Vec::new(),
            recommendation_text: "Compare per-provider mention rates to find the outliers \
                                  dragging alignment down."
                .to_string(),
            detected_at: now,
        });
    }

    if let Some(finding) = detect_divergence(aggregates, now) {
        findings.push(finding);
    }

    findings
}

/// The cross-provider divergence condition: max − min mention rate > 30.
///
/// Names the highest- and lowest-rate providers. Ties break on provider
/// name so repeated runs over identical input emit identical findings.
fn detect_divergence(
    aggregates: &HashMap<Provider, ProviderAggregate>,
    now: DateTime<Utc>,
) -> Option<RiskFinding> {
    if aggregates.len() < 2 {
        return None;
    }

    let mut ranked: Vec<(&Provider, f64)> = aggregates
        .iter()
        .map(|(provider, agg)| (provider, agg.mention_rate()))
        .collect();
    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let (lowest, low_rate) = ranked[0];
    let (highest, high_rate) = ranked[ranked.len() - 1];
    let spread = high_rate - low_rate;

    if spread <= DIVERGENCE_RISK_THRESHOLD {
        return None;
    }

    Some(RiskFinding {
        level: RiskLevel::High,
        title: "Multi-provider divergence".to_string(),
        message: format!(
            "Mention rates span {spread:.1} points: {highest} at {high_rate:.1}% vs {lowest} \
             at {low_rate:.1}%."
        ),
        metric_value: spread,
        threshold: DIVERGENCE_RISK_THRESHOLD,
        affected_providers: vec![highest.to_string(), lowest.to_string()],
        recommendation_text: "Audit the queries behind the low-rate provider; divergence this \
                              wide usually means one provider stopped surfacing the brand."
            .to_string(),
        detected_at: now,
    })
}
