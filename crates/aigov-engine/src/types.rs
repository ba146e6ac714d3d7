use aigov_core::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observation of whether a brand was referenced by one AI provider
/// for one query. Read-only input to the engine; rows are written by the
/// external collection jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub brand_id: i64,
    pub provider: Provider,
    pub query: String,
    pub mentioned: bool,
    /// Confidence in [0, 100]. Out-of-range values are clamped during
    /// aggregation, never rejected.
    pub confidence: f64,
    pub collected_at: DateTime<Utc>,
}

/// Per-provider rollup of one mention window.
///
/// Invariants: `mentioned_count <= total`; `confidences.len() == total`.
#[derive(Debug, Clone)]
pub struct ProviderAggregate {
    pub provider: Provider,
    pub total: usize,
    pub mentioned_count: usize,
    pub confidences: Vec<f64>,
}

impl ProviderAggregate {
    /// Share of this provider's observations that mentioned the brand, in [0, 100].
    #[must_use]
    pub fn mention_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.mentioned_count as f64 / self.total as f64 * 100.0;
        rate
    }

    /// Mean confidence across all observations, in [0, 100]. 0 if empty.
    #[must_use]
    pub fn avg_confidence(&self) -> f64 {
        crate::stats::mean(&self.confidences)
    }
}

/// One computed set of governance indices for a brand.
///
/// Immutable once written: the history store is append-only and the most
/// recent snapshot wins for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub brand_id: i64,
    /// Index of Cognitive Efficiency — cross-provider consensus strength.
    pub ice: f64,
    /// Governance Alignment Precision — weighted share of aligned providers.
    pub gap: f64,
    /// Cognitive Predictive Index — fixed-weight composite (or the
    /// authoritative upstream value when one was supplied).
    pub cpi: f64,
    /// Inverse of period-over-period volatility in mention behavior.
    pub cognitive_stability: f64,
    /// Presentation-facing average of the four indices.
    pub compliance_score: f64,
    /// Overall mention rate for the window; the basis the next
    /// computation's stability comparison uses.
    pub mention_rate: f64,
    /// True when the window held no mentions at all. All indices are 0.
    pub insufficient_data: bool,
    pub calculated_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// The well-formed all-zero snapshot for a window with no mentions.
    #[must_use]
    pub fn insufficient(brand_id: i64, calculated_at: DateTime<Utc>) -> Self {
        Self {
            brand_id,
            ice: 0.0,
            gap: 0.0,
            cpi: 0.0,
            cognitive_stability: 0.0,
            compliance_score: 0.0,
            mention_rate: 0.0,
            insufficient_data: true,
            calculated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Medium,
    High,
}

/// One triggered risk condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFinding {
    pub level: RiskLevel,
    pub title: String,
    pub message: String,
    pub metric_value: f64,
    pub threshold: f64,
    /// Providers implicated by the condition; empty for brand-wide findings.
    pub affected_providers: Vec<String>,
    pub recommendation_text: String,
    pub detected_at: DateTime<Utc>,
}

/// Display severity for recommendations. Variant order is sort order:
/// critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Info,
}

/// One templated recommendation produced by the rules table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
    pub impact: String,
}

/// Everything one recomputation produces: the snapshot plus derived
/// findings and recommendations.
#[derive(Debug, Clone, Serialize)]
pub struct GovernanceAssessment {
    pub snapshot: MetricsSnapshot,
    pub findings: Vec<RiskFinding>,
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_rate_handles_empty_aggregate() {
        let agg = ProviderAggregate {
            provider: Provider::Chatgpt,
            total: 0,
            mentioned_count: 0,
            confidences: Vec::new(),
        };
        assert_eq!(agg.mention_rate(), 0.0);
        assert_eq!(agg.avg_confidence(), 0.0);
    }

    #[test]
    fn mention_rate_is_percentage() {
        let agg = ProviderAggregate {
            provider: Provider::Gemini,
            total: 4,
            mentioned_count: 3,
            confidences: vec![80.0, 90.0, 70.0, 60.0],
        };
        assert!((agg.mention_rate() - 75.0).abs() < f64::EPSILON);
        assert!((agg.avg_confidence() - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn priority_sorts_critical_first() {
        let mut priorities = vec![Priority::Info, Priority::Critical, Priority::Medium];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![Priority::Critical, Priority::Medium, Priority::Info]
        );
    }

    #[test]
    fn risk_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
        assert_eq!(
            serde_json::to_string(&Priority::Critical).unwrap(),
            "\"critical\""
        );
    }

    #[test]
    fn insufficient_snapshot_is_all_zeros() {
        let snap = MetricsSnapshot::insufficient(7, chrono::Utc::now());
        assert!(snap.insufficient_data);
        assert_eq!(snap.ice, 0.0);
        assert_eq!(snap.gap, 0.0);
        assert_eq!(snap.cpi, 0.0);
        assert_eq!(snap.cognitive_stability, 0.0);
        assert_eq!(snap.compliance_score, 0.0);
    }
}
