// src/relevance.rs
//! Cheap relevance gate applied before any model call: empty-title reject,
//! in-cycle title dedup, markup stripping, and an HIV/AIDS keyword check.
//! High recall, low precision; the classifier is the real arbiter.

use std::collections::HashSet;

use metrics::counter;

use crate::config::RelevanceConfig;
use crate::ingest::normalize_text;
use crate::ingest::types::SourcedItem;

/// Case-insensitive substrings; any hit in title + summary passes the gate.
pub const HIV_KEYWORDS: &[&str] = &[
    "hiv",
    "aids",
    "prep",
    "antiretroviral",
    " art ",
    "art.",
    "arv",
    "viral load",
    "95-95-95",
    "unaids",
    "pepfar",
    "cabotegravir",
    "lenacapavir",
    "islatravir",
    "dolutegravir",
    "biktarvy",
    "bnab",
    "pep",
    "cd4",
    "undetectable",
    "u=u",
    "hiv/aids",
    "hiv prevention",
    "hiv treatment",
    "hiv vaccine",
    "hiv cure",
];

/// Title phrases that mark access/funding cuts, sensational coverage, or
/// tabloid sources. Such items never become cards.
pub const NON_DISCOVERY_PHRASES: &[&str] = &[
    "lose access",
    "set to lose",
    "losing access",
    "funding cut",
    "funding cuts",
    "cuts to ",
    "cut access",
    "lose their",
    "could lose",
    "may lose",
    "at risk of losing",
    "explodes",
    "surges",
    "honeymoon",
    "crystal meth",
    "epidemic explodes",
    "epidemic surges",
    "fox news",
    "daily mail",
];

/// A raw item that survived the gate, with its plain-text summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub source_name: String,
    pub index: usize,
    pub title: String,
    pub link: Option<String>,
    pub summary: String,
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub empty_title: usize,
    pub duplicate: usize,
    pub off_topic: usize,
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct RelevanceGate {
    keywords: Vec<String>,
    reject_phrases: Vec<String>,
    summary_max_chars: usize,
}

fn merge_vocab(base: &[&str], extra: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    base.iter()
        .map(|s| s.to_string())
        .chain(extra.iter().map(|s| s.trim().to_lowercase()))
        .filter(|s| !s.trim().is_empty() && seen.insert(s.clone()))
        .collect()
}

impl Default for RelevanceGate {
    fn default() -> Self {
        Self::new(&RelevanceConfig::default(), 400)
    }
}

impl RelevanceGate {
    pub fn new(cfg: &RelevanceConfig, summary_max_chars: usize) -> Self {
        Self {
            keywords: merge_vocab(HIV_KEYWORDS, &cfg.extra_keywords),
            reject_phrases: merge_vocab(NON_DISCOVERY_PHRASES, &cfg.extra_reject_phrases),
            summary_max_chars,
        }
    }

    pub fn summary_max_chars(&self) -> usize {
        self.summary_max_chars
    }

    pub fn is_hiv_related(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub fn looks_like_non_discovery(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.reject_phrases.iter().any(|p| lower.contains(p.as_str()))
    }

    /// Turn this cycle's raw items into candidates, keeping input order.
    pub fn filter(&self, items: Vec<SourcedItem>) -> (Vec<CandidateItem>, FilterStats) {
        let mut stats = FilterStats::default();
        let mut seen_titles: HashSet<String> = HashSet::new();
        let mut out = Vec::new();

        for SourcedItem {
            source_name,
            index,
            item,
        } in items
        {
            let title = item.title.trim().to_string();
            if title.is_empty() {
                stats.empty_title += 1;
                continue;
            }
            // First-seen wins across sources.
            if !seen_titles.insert(title.to_lowercase()) {
                stats.duplicate += 1;
                continue;
            }

            let body = if item.summary_html.trim().is_empty() {
                title.as_str()
            } else {
                item.summary_html.as_str()
            };
            let summary = normalize_text(body, self.summary_max_chars);

            if !self.is_hiv_related(&format!("{title} {summary}")) {
                stats.off_topic += 1;
                continue;
            }

            out.push(CandidateItem {
                source_name,
                index,
                title,
                link: item.link,
                summary,
                published_at: item.published_at,
            });
        }

        stats.kept = out.len();
        counter!("discovery_candidates_total").increment(stats.kept as u64);
        counter!("discovery_filtered_total", "reason" => "empty_title").increment(stats.empty_title as u64);
        counter!("discovery_filtered_total", "reason" => "duplicate").increment(stats.duplicate as u64);
        counter!("discovery_filtered_total", "reason" => "off_topic").increment(stats.off_topic as u64);
        tracing::debug!(
            target: "relevance",
            kept = stats.kept,
            duplicate = stats.duplicate,
            off_topic = stats.off_topic,
            empty = stats.empty_title,
            "relevance filter done"
        );

        (out, stats)
    }
}
