//! Command handlers for the CLI.
//!
//! These are called from `main` after the database pool and config are
//! established. Per-brand failures during recompute are logged and skipped
//! rather than propagated so a single bad brand does not abort the full run.

use std::fmt::Write as _;

use chrono::{Duration, Utc};

use aigov_engine::{GovernanceAssessment, Mention};

/// Sync the brands defined in the YAML config into the database.
pub(crate) async fn run_seed(
    pool: &sqlx::PgPool,
    config: &aigov_core::AppConfig,
) -> anyhow::Result<()> {
    let brands_file = aigov_core::load_brands(&config.brands_path)?;
    let count = aigov_db::seed_brands(pool, &brands_file).await?;
    println!("seeded {count} brands from {}", config.brands_path.display());
    Ok(())
}

/// Recompute and persist governance snapshots.
///
/// With `brand_filter` set, runs for that single brand and returns an error
/// if the slug is unknown. Without it, runs for every active brand;
/// per-brand failures are printed and skipped.
pub(crate) async fn run_recompute(
    pool: &sqlx::PgPool,
    config: &aigov_core::AppConfig,
    brand_filter: Option<&str>,
) -> anyhow::Result<()> {
    let brands = load_brands_for_run(pool, brand_filter).await?;
    let brand_count = brands.len();
    let mut persisted: usize = 0;

    for brand in &brands {
        let assessment = match assess_brand(pool, config, brand).await {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: recompute failed for {}: {e}", brand.slug);
                continue;
            }
        };

        if let Err(e) = aigov_db::insert_metrics_snapshot(pool, &assessment.snapshot).await {
            eprintln!("error: snapshot insert failed for {}: {e}", brand.slug);
            continue;
        }

        tracing::info!(
            brand = %brand.slug,
            compliance = assessment.snapshot.compliance_score,
            findings = assessment.findings.len(),
            "snapshot persisted"
        );
        persisted += 1;
    }

    println!("recomputed metrics for {persisted} of {brand_count} brands");
    Ok(())
}

/// Compute and print the current assessment for one brand without
/// persisting anything.
pub(crate) async fn run_report(
    pool: &sqlx::PgPool,
    config: &aigov_core::AppConfig,
    slug: &str,
    json: bool,
) -> anyhow::Result<()> {
    let brand = aigov_db::get_brand_by_slug(pool, slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("brand '{slug}' not found"))?;

    let assessment = assess_brand(pool, config, &brand).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print!("{}", render_report(&brand.name, &assessment));
    }

    Ok(())
}

/// Load the brands to process for a recompute run.
async fn load_brands_for_run(
    pool: &sqlx::PgPool,
    brand_filter: Option<&str>,
) -> anyhow::Result<Vec<aigov_db::BrandRow>> {
    match brand_filter {
        Some(slug) => {
            let brand = aigov_db::get_brand_by_slug(pool, slug)
                .await?
                .ok_or_else(|| anyhow::anyhow!("brand '{slug}' not found"))?;
            Ok(vec![brand])
        }
        None => Ok(aigov_db::list_active_brands(pool).await?),
    }
}

/// Fetch the mention window, prior snapshot, and CPI override for a brand
/// and run the engine.
async fn assess_brand(
    pool: &sqlx::PgPool,
    config: &aigov_core::AppConfig,
    brand: &aigov_db::BrandRow,
) -> anyhow::Result<GovernanceAssessment> {
    let since = Utc::now() - Duration::days(config.metrics_window_days);

    let mentions: Vec<Mention> = aigov_db::list_mentions_since(pool, brand.id, since)
        .await?
        .into_iter()
        .map(aigov_db::MentionRow::into_mention)
        .collect();

    let prior = aigov_db::get_latest_metrics_by_brand(pool, brand.id)
        .await?
        .map(aigov_db::MetricsSnapshotRow::into_snapshot);

    let cpi_override = aigov_db::get_latest_cpi_score(pool, brand.id).await?;

    Ok(aigov_engine::evaluate_brand(
        &mentions,
        prior.as_ref(),
        cpi_override,
        brand.id,
        Utc::now(),
    ))
}

/// Render the text report printed by `report` without `--json`.
fn render_report(brand_name: &str, assessment: &GovernanceAssessment) -> String {
    let s = &assessment.snapshot;
    let mut out = String::new();

    let _ = writeln!(out, "governance report: {brand_name}");
    let _ = writeln!(out, "computed at: {}", s.calculated_at.to_rfc3339());
    if s.insufficient_data {
        let _ = writeln!(out, "status: insufficient data for the current window");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  ICE                 {:>6.1}", s.ice);
    let _ = writeln!(out, "  GAP                 {:>6.1}", s.gap);
    let _ = writeln!(out, "  CPI                 {:>6.1}", s.cpi);
    let _ = writeln!(out, "  cognitive stability {:>6.1}", s.cognitive_stability);
    let _ = writeln!(out, "  compliance score    {:>6.1}", s.compliance_score);

    if assessment.findings.is_empty() {
        let _ = writeln!(out, "\nno risk findings");
    } else {
        let _ = writeln!(out, "\nrisk findings ({}):", assessment.findings.len());
        for f in &assessment.findings {
            let _ = writeln!(out, "  [{:?}] {} — {}", f.level, f.title, f.message);
        }
    }

    if !assessment.recommendations.is_empty() {
        let _ = writeln!(
            out,
            "\nrecommendations ({}):",
            assessment.recommendations.len()
        );
        for r in &assessment.recommendations {
            let _ = writeln!(out, "  [{:?}] {}: {}", r.priority, r.title, r.description);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use aigov_engine::MetricsSnapshot;

    fn mention(
        provider: aigov_core::Provider,
        mentioned: bool,
        confidence: f64,
        collected_at: chrono::DateTime<Utc>,
    ) -> Mention {
        Mention {
            brand_id: 1,
            provider,
            query: "best analytics platform".to_owned(),
            mentioned,
            confidence,
            collected_at,
        }
    }

    fn sample_assessment() -> GovernanceAssessment {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mentions = vec![
            mention(aigov_core::Provider::Chatgpt, true, 90.0, now),
            mention(aigov_core::Provider::Gemini, true, 85.0, now),
        ];
        aigov_engine::evaluate_brand(&mentions, None, None, 1, now)
    }

    #[test]
    fn report_includes_all_indices_and_brand_name() {
        let rendered = render_report("Acme Labs", &sample_assessment());

        assert!(rendered.contains("governance report: Acme Labs"));
        assert!(rendered.contains("ICE"));
        assert!(rendered.contains("GAP"));
        assert!(rendered.contains("CPI"));
        assert!(rendered.contains("cognitive stability"));
        assert!(rendered.contains("compliance score"));
    }

    #[test]
    fn report_flags_insufficient_data() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let assessment = GovernanceAssessment {
            snapshot: MetricsSnapshot::insufficient(1, now),
            findings: vec![],
            recommendations: vec![],
        };

        let rendered = render_report("Acme Labs", &assessment);
        assert!(rendered.contains("insufficient data"));
        assert!(rendered.contains("no risk findings"));
    }

    #[test]
    fn report_lists_findings_and_recommendations() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        // One provider at 100%, one at 20% — divergence plus low composites.
        let mentions: Vec<Mention> = (0..5)
            .map(|i| {
                mention(
                    aigov_core::Provider::Chatgpt,
                    true,
                    90.0,
                    now - Duration::days(i),
                )
            })
            .chain((0..5).map(|i| {
                mention(
                    aigov_core::Provider::Gemini,
                    i == 0,
                    40.0,
                    now - Duration::days(i),
                )
            }))
            .collect();

        let assessment = aigov_engine::evaluate_brand(&mentions, None, None, 1, now);
        assert!(!assessment.findings.is_empty());

        let rendered = render_report("Acme Labs", &assessment);
        assert!(rendered.contains("risk findings"));
        assert!(rendered.contains("recommendations"));
    }
}
