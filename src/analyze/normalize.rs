// src/analyze/normalize.rs
//! Repair raw cards into fully populated `DiscoveryCard`s: defaults for
//! missing fields, source label alignment, unique ids, and a second pass of
//! the relevance gate over the card's own text.

use std::collections::HashSet;

use metrics::counter;
use time::OffsetDateTime;

use crate::analyze::degraded::{confidence_basis_for, DEFAULT_REGION, GENERIC_WHY_THIS_MATTERS};
use crate::card::{DiscoveryCard, DiscoveryType, RawCard};
use crate::ingest::{clean_title, format_announced, normalize_text};
use crate::relevance::{CandidateItem, RelevanceGate};

/// Model summaries are a few sentences; this only guards against runaway output.
const CARD_TEXT_MAX_CHARS: usize = 1200;

/// Lowercase ASCII slug: runs of anything else become a single hyphen.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

pub fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Per-run normalizer; owns the id set that keeps ids unique in one snapshot.
pub struct CardNormalizer {
    now: OffsetDateTime,
    suffix: String,
    seen_ids: HashSet<String>,
}

impl CardNormalizer {
    pub fn new(now_ms: i64) -> Self {
        let now = OffsetDateTime::from_unix_timestamp_nanos(i128::from(now_ms) * 1_000_000)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self {
            now,
            suffix: to_base36(now_ms.max(0) as u64),
            seen_ids: HashSet::new(),
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    pub fn normalize(
        &mut self,
        raw: RawCard,
        ctx: &CandidateItem,
        gate: &RelevanceGate,
    ) -> Option<DiscoveryCard> {
        let title = non_blank(raw.title)
            .map(|t| clean_title(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| clean_title(&ctx.title));
        let summary = non_blank(raw.summary)
            .map(|s| normalize_text(&s, CARD_TEXT_MAX_CHARS))
            .filter(|s| !s.is_empty())
            .or_else(|| Some(ctx.summary.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| title.clone());

        if !gate.is_hiv_related(&format!("{title} {summary}")) {
            tracing::debug!(target: "classifier", title = %title, "card dropped: off-topic after classification");
            counter!("discovery_filtered_total", "reason" => "off_topic_card").increment(1);
            return None;
        }
        if gate.looks_like_non_discovery(&ctx.title) || gate.looks_like_non_discovery(&title) {
            tracing::debug!(target: "classifier", title = %title, "card dropped: not a discovery");
            counter!("discovery_filtered_total", "reason" => "non_discovery").increment(1);
            return None;
        }

        let discovery_type = raw
            .discovery_type
            .as_deref()
            .and_then(DiscoveryType::from_label)
            .unwrap_or_default();

        let mut sources: Vec<String> = raw
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sources.is_empty() {
            sources.push(
                ctx.link
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .unwrap_or(&ctx.source_name)
                    .to_string(),
            );
        }

        let source_labels = match raw.source_labels {
            Some(labels) if labels.len() == sources.len() => labels
                .into_iter()
                .map(|l| non_blank(Some(l)).unwrap_or_else(|| ctx.source_name.clone()))
                .collect(),
            _ => vec![ctx.source_name.clone(); sources.len()],
        };

        let id = self.assign_id(raw.id, &title, ctx.index);

        Some(DiscoveryCard {
            id,
            title,
            country_or_region: non_blank(raw.country_or_region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            discovery_type,
            summary,
            why_this_matters: non_blank(raw.why_this_matters)
                .map(|w| normalize_text(&w, CARD_TEXT_MAX_CHARS))
                .unwrap_or_else(|| GENERIC_WHY_THIS_MATTERS.to_string()),
            date_announced: non_blank(raw.date_announced)
                .unwrap_or_else(|| format_announced(ctx.published_at.as_deref(), self.now)),
            sources,
            source_labels,
            confidence_basis: non_blank(raw.confidence_basis)
                .unwrap_or_else(|| confidence_basis_for(&ctx.source_name)),
        })
    }

    fn assign_id(&mut self, proposed: Option<String>, title: &str, index: usize) -> String {
        if let Some(id) = non_blank(proposed) {
            if self.seen_ids.insert(id.clone()) {
                return id;
            }
        }

        let slug = match slugify(title) {
            s if s.is_empty() => "discovery".to_string(),
            s => s,
        };
        let base = format!("{slug}-{index}-{}", self.suffix);
        let mut id = base.clone();
        let mut n = 2;
        while !self.seen_ids.insert(id.clone()) {
            id = format!("{base}-{n}");
            n += 1;
        }
        id
    }
}
