//! Recommendation Engine: a declarative band table mapping metric values to
//! templated recommendations.

use crate::types::{MetricsSnapshot, Priority, Recommendation};

/// Compliance score at or above which the single "doing well" info
/// recommendation is emitted.
pub const COMPLIANCE_EXCELLENT: f64 = 85.0;
/// Compliance score below which the immediate-intervention recommendation
/// is emitted.
pub const COMPLIANCE_CRITICAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Cpi,
    Gap,
    Stability,
}

impl MetricKind {
    fn value(self, snapshot: &MetricsSnapshot) -> f64 {
        match self {
            MetricKind::Cpi => snapshot.cpi,
            MetricKind::Gap => snapshot.gap,
            MetricKind::Stability => snapshot.cognitive_stability,
        }
    }

    fn category(self) -> &'static str {
        match self {
            MetricKind::Cpi => "predictive-performance",
            MetricKind::Gap => "governance-alignment",
            MetricKind::Stability => "stability",
        }
    }

    fn label(self) -> &'static str {
        match self {
            MetricKind::Cpi => "CPI",
            MetricKind::Gap => "GAP",
            MetricKind::Stability => "Cognitive stability",
        }
    }
}

/// One row of the rules table: fires when `lo <= value < hi`.
///
/// Bands per metric are disjoint and lower is always worse. Rules are
/// evaluated top to bottom with no early exit, so a snapshot can yield
/// zero, one, or several recommendations.
struct BandRule {
    metric: MetricKind,
    lo: f64,
    hi: f64,
    priority: Priority,
}

const BAND_RULES: &[BandRule] = &[
    BandRule { metric: MetricKind::Cpi, lo: 0.0, hi: 50.0, priority: Priority::Critical },
    BandRule { metric: MetricKind::Cpi, lo: 50.0, hi: 70.0, priority: Priority::High },
    BandRule { metric: MetricKind::Cpi, lo: 70.0, hi: 85.0, priority: Priority::Medium },
    BandRule { metric: MetricKind::Gap, lo: 0.0, hi: 50.0, priority: Priority::Critical },
    BandRule { metric: MetricKind::Gap, lo: 50.0, hi: 70.0, priority: Priority::High },
    BandRule { metric: MetricKind::Gap, lo: 70.0, hi: 85.0, priority: Priority::Medium },
    BandRule { metric: MetricKind::Stability, lo: 0.0, hi: 50.0, priority: Priority::Critical },
    BandRule { metric: MetricKind::Stability, lo: 50.0, hi: 70.0, priority: Priority::High },
    BandRule { metric: MetricKind::Stability, lo: 70.0, hi: 85.0, priority: Priority::Medium },
];

/// Evaluate the rules table against a snapshot.
///
/// Output is sorted for display: critical > high > medium > info. Each rule
/// is a pure template of the metric value, so identical snapshots produce
/// identical recommendation text. Insufficient-data snapshots produce
/// nothing — there is no basis to recommend anything yet.
#[must_use]
pub fn recommend(snapshot: &MetricsSnapshot) -> Vec<Recommendation> {
    if snapshot.insufficient_data {
        return Vec::new();
    }

    let mut recommendations: Vec<Recommendation> = BAND_RULES
        .iter()
        .filter(|rule| {
            let value = rule.metric.value(snapshot);
            value >= rule.lo && value < rule.hi
        })
        .map(|rule| metric_template(rule.metric, rule.priority, rule.metric.value(snapshot)))
        .collect();

    // The two overall-score rules are mutually exclusive by construction
    // (85 and 50 cannot both bound the same value), and the critical one is
    // additive to any per-metric output above.
    if snapshot.compliance_score >= COMPLIANCE_EXCELLENT {
        recommendations.push(excellent_template(snapshot.compliance_score));
    } else if snapshot.compliance_score < COMPLIANCE_CRITICAL {
        recommendations.push(intervention_template(snapshot.compliance_score));
    }

    // Stable sort keeps per-metric order within a priority.
    recommendations.sort_by_key(|r| r.priority);
    recommendations
}

fn metric_template(metric: MetricKind, priority: Priority, value: f64) -> Recommendation {
    let label = metric.label();
    let (title, description, impact) = match priority {
        Priority::Critical => (
            format!("{label} critically low"),
            format!(
                "{label} is at {value:.1}, deep in the critical band. Governance reporting \
                 for this brand cannot be considered reliable until it recovers."
            ),
            "Restores a usable baseline for every downstream compliance report.".to_string(),
        ),
        Priority::High => (
            format!("{label} needs attention"),
            format!(
                "{label} is at {value:.1}, below the acceptable range. Left alone this \
                 typically degrades further across collection cycles."
            ),
            "Prevents a slide into the critical band.".to_string(),
        ),
        // Medium is the only other band priority; Info never appears in BAND_RULES.
        _ => (
            format!("{label} slightly under target"),
            format!("{label} is at {value:.1}, just under the target band."),
            "Incremental improvement toward the healthy range.".to_string(),
        ),
    };

    Recommendation {
        priority,
        category: metric.category().to_string(),
        title,
        description,
        actions: metric_actions(metric),
        impact,
    }
}

fn metric_actions(metric: MetricKind) -> Vec<String> {
    match metric {
        MetricKind::Cpi => vec![
            "Identify which of ICE, GAP, or stability is dragging the composite down".to_string(),
            "Expand the query set for underrepresented topics".to_string(),
            "Schedule an additional collection run before the next reporting cycle".to_string(),
        ],
        MetricKind::Gap => vec![
            "Compare per-provider mention rates against the consensus mean".to_string(),
            "Review outlier providers' answers for stale or conflicting brand facts".to_string(),
            "Publish or refresh canonical brand content the outlier providers can pick up"
                .to_string(),
        ],
        MetricKind::Stability => vec![
            "Diff this window's mention rate against the previous snapshot".to_string(),
            "Correlate the shift with recent brand events or coverage changes".to_string(),
            "Shorten the recompute interval until the trend settles".to_string(),
        ],
    }
}

fn excellent_template(score: f64) -> Recommendation {
    Recommendation {
        priority: Priority::Info,
        category: "overall".to_string(),
        title: "Governance posture is strong".to_string(),
        description: format!(
            "Overall compliance is {score:.1}. All indices sit in or near the healthy band; \
             keep the current collection cadence."
        ),
        actions: vec![
            "Maintain the current query set and collection schedule".to_string(),
            "Archive this period's report as the comparison baseline".to_string(),
        ],
        impact: "Documents a healthy baseline for future comparisons.".to_string(),
    }
}

fn intervention_template(score: f64) -> Recommendation {
    Recommendation {
        priority: Priority::Critical,
        category: "overall".to_string(),
        title: "Immediate intervention required".to_string(),
        description: format!(
            "Overall compliance is {score:.1}, below the intervention threshold. Multiple \
             indices are failing at once; treat this as an incident, not a trend."
        ),
        actions: vec![
            "Convene the brand-governance owners on the underlying index failures".to_string(),
            "Re-run collection to rule out a bad window".to_string(),
            "Track daily until the score clears the critical threshold".to_string(),
        ],
        impact: "Stops compounding damage across every governance metric.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn snapshot(ice: f64, gap: f64, cpi: f64, stability: f64, compliance: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            brand_id: 1,
            ice,
            gap,
            cpi,
            cognitive_stability: stability,
            compliance_score: compliance,
            mention_rate: 50.0,
            insufficient_data: false,
            calculated_at: Utc::now(),
        }
    }

    #[test]
    fn healthy_snapshot_yields_only_info() {
        let snap = snapshot(95.0, 92.0, 93.0, 96.0, 94.0);
        let recs = recommend(&snap);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Info);
        assert_eq!(recs[0].category, "overall");
    }

    #[test]
    fn compliance_exactly_85_triggers_info() {
        let snap = snapshot(90.0, 85.0, 85.0, 90.0, 85.0);
        let recs = recommend(&snap);
        assert!(recs.iter().any(|r| r.priority == Priority::Info));
    }

    #[test]
    fn compliance_just_below_85_does_not_trigger_info() {
        let snap = snapshot(90.0, 85.0, 85.0, 90.0, 84.999);
        let recs = recommend(&snap);
        assert!(recs.iter().all(|r| r.priority != Priority::Info));
    }

    #[test]
    fn critical_overall_is_additive_to_metric_rules() {
        // CPI 40 → critical band; GAP 60 → high band; compliance 45 → overall critical.
        let snap = snapshot(50.0, 60.0, 40.0, 90.0, 45.0);
        let recs = recommend(&snap);

        let overall: Vec<_> = recs.iter().filter(|r| r.category == "overall").collect();
        assert_eq!(overall.len(), 1);
        assert_eq!(overall[0].priority, Priority::Critical);
        assert_eq!(overall[0].title, "Immediate intervention required");

        assert!(recs
            .iter()
            .any(|r| r.category == "predictive-performance" && r.priority == Priority::Critical));
        assert!(recs
            .iter()
            .any(|r| r.category == "governance-alignment" && r.priority == Priority::High));
    }

    #[test]
    fn bands_are_disjoint_per_metric() {
        // Sweep values across band edges: each metric may fire at most once.
        for value in [0.0, 49.999, 50.0, 69.999, 70.0, 84.999, 85.0, 100.0] {
            let snap = snapshot(90.0, 90.0, value, 90.0, 60.0);
            let cpi_recs: Vec<_> = recommend(&snap)
                .into_iter()
                .filter(|r| r.category == "predictive-performance")
                .collect();
            assert!(cpi_recs.len() <= 1, "value {value} fired {}", cpi_recs.len());
        }
    }

    #[test]
    fn band_boundaries_pick_the_worse_priority_below_the_edge() {
        let snap = snapshot(90.0, 90.0, 49.999, 90.0, 60.0);
        let recs = recommend(&snap);
        let cpi = recs
            .iter()
            .find(|r| r.category == "predictive-performance")
            .unwrap();
        assert_eq!(cpi.priority, Priority::Critical);

        let snap = snapshot(90.0, 90.0, 50.0, 90.0, 60.0);
        let recs = recommend(&snap);
        let cpi = recs
            .iter()
            .find(|r| r.category == "predictive-performance")
            .unwrap();
        assert_eq!(cpi.priority, Priority::High);
    }

    #[test]
    fn output_is_sorted_by_severity() {
        let snap = snapshot(50.0, 72.0, 55.0, 40.0, 54.0);
        let recs = recommend(&snap);
        let priorities: Vec<Priority> = recs.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
    }

    #[test]
    fn templates_are_deterministic() {
        let snap = snapshot(50.0, 60.0, 40.0, 90.0, 45.0);
        let a = recommend(&snap);
        let b = recommend(&snap);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.title, y.title);
            assert_eq!(x.description, y.description);
            assert_eq!(x.actions, y.actions);
        }
    }

    #[test]
    fn descriptions_carry_the_metric_value() {
        let snap = snapshot(90.0, 90.0, 62.5, 90.0, 60.0);
        let recs = recommend(&snap);
        let cpi = recs
            .iter()
            .find(|r| r.category == "predictive-performance")
            .unwrap();
        assert!(cpi.description.contains("62.5"), "{}", cpi.description);
    }

    #[test]
    fn insufficient_data_yields_no_recommendations() {
        let snap = MetricsSnapshot::insufficient(1, Utc::now());
        assert!(recommend(&snap).is_empty());
    }
}
