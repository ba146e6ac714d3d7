//! Grouping of raw mentions into per-provider aggregates.

use std::collections::HashMap;

use aigov_core::Provider;

use crate::types::{Mention, ProviderAggregate};

/// Group a mention window by provider.
///
/// Providers with no mentions in the window are simply absent from the map —
/// never represented by a zero-division artifact. Confidence values outside
/// [0, 100] (e.g. a raw 0–1 fraction written upstream) are clamped and
/// logged; one bad row never fails the computation.
///
/// The map carries no iteration-order guarantee; consumers must not rely on
/// order for numeric results.
#[must_use]
pub fn aggregate(mentions: &[Mention]) -> HashMap<Provider, ProviderAggregate> {
    let mut out: HashMap<Provider, ProviderAggregate> = HashMap::new();

    for mention in mentions {
        let confidence = if (0.0..=100.0).contains(&mention.confidence) {
            mention.confidence
        } else {
            tracing::warn!(
                brand_id = mention.brand_id,
                provider = %mention.provider,
                confidence = mention.confidence,
                "confidence outside [0, 100]; clamping"
            );
            mention.confidence.clamp(0.0, 100.0)
        };

        let entry = out
            .entry(mention.provider)
            .or_insert_with(|| ProviderAggregate {
                provider: mention.provider,
                total: 0,
                mentioned_count: 0,
                confidences: Vec::new(),
            });

        entry.total += 1;
        if mention.mentioned {
            entry.mentioned_count += 1;
        }
        entry.confidences.push(confidence);
    }

    out
}
