// src/analyze/degraded.rs
//! Rule-based card built straight from feed metadata, used when no classifier
//! is configured. The non-discovery phrase check runs in the normalizer.

use time::OffsetDateTime;

use crate::card::{DiscoveryType, RawCard};
use crate::ingest::{clean_title, format_announced};
use crate::relevance::CandidateItem;

pub const GENERIC_WHY_THIS_MATTERS: &str =
    "Relevant HIV/AIDS news from an authoritative feed. See source for full context.";

pub const DEFAULT_REGION: &str = "Global";

pub fn confidence_basis_for(source_name: &str) -> String {
    format!("RSS feed: {source_name}")
}

pub fn degraded_card(item: &CandidateItem, now: OffsetDateTime) -> RawCard {
    let title = clean_title(&item.title);
    let summary = if item.summary.is_empty() {
        title.clone()
    } else {
        item.summary.clone()
    };
    let sources = match item.link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => vec![link.to_string()],
        _ => vec![item.source_name.clone()],
    };

    RawCard {
        id: None,
        title: Some(title),
        country_or_region: Some(DEFAULT_REGION.to_string()),
        discovery_type: Some(DiscoveryType::Research.as_str().to_string()),
        summary: Some(summary),
        why_this_matters: Some(GENERIC_WHY_THIS_MATTERS.to_string()),
        date_announced: Some(format_announced(item.published_at.as_deref(), now)),
        sources: Some(sources),
        source_labels: Some(vec![item.source_name.clone()]),
        confidence_basis: Some(confidence_basis_for(&item.source_name)),
    }
}
