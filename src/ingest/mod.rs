// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod sources;
pub mod types;

use std::sync::Arc;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::ingest::types::{FeedProvider, SourcedItem};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "discovery_analysis_total",
            "Free-text analyses served, by outcome (model or cache)."
        );
        describe_counter!(
            "discovery_feed_items_total",
            "Raw items parsed from feed sources."
        );
        describe_counter!(
            "discovery_source_errors_total",
            "Feed source failures by kind."
        );
        describe_counter!(
            "discovery_candidates_total",
            "Items that passed dedup + keyword gate."
        );
        describe_counter!(
            "discovery_filtered_total",
            "Items dropped by the relevance filter, by reason."
        );
        describe_counter!("discovery_batches_total", "Classifier batches issued.");
        describe_counter!(
            "discovery_batch_failures_total",
            "Classifier batches that yielded no cards, by reason."
        );
        describe_counter!("discovery_cards_total", "Cards produced by refresh runs.");
        describe_counter!("discovery_cache_hits_total", "Fresh snapshot served.");
        describe_counter!(
            "discovery_stale_fallback_total",
            "Runs that fell back to the stale snapshot."
        );
        describe_counter!(
            "discovery_snapshot_write_errors_total",
            "Snapshot persistence failures."
        );
        describe_histogram!("discovery_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("discovery_refresh_ms", "Full refresh duration in milliseconds.");
        describe_gauge!(
            "discovery_last_refresh_ts",
            "Unix ts of the last completed refresh."
        );
        describe_gauge!("discovery_cache_ttl_secs", "Snapshot freshness window.");
    });
}

/// Strip markup to plain text: entity decode, tag strip, quote folding,
/// whitespace collapse, then cap at `max_chars` characters.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Drop script/style bodies, then strip remaining tags
    static RE_BLOCKS: OnceCell<regex::Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        regex::Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
            .expect("static regex")
    });
    out = re_blocks.replace_all(&out, " ").to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{00A0}', " ");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap (chars, not bytes)
    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect::<String>().trim_end().to_string();
    }

    out
}

/// Titles keep their text but lose stray markup and repeated whitespace.
pub fn clean_title(s: &str) -> String {
    normalize_text(s, 500)
}

/// Human-readable "Mon YYYY" from an RFC 2822 / RFC 3339 feed date; unparseable
/// or missing dates fall back to the current month.
pub fn format_announced(published: Option<&str>, now: OffsetDateTime) -> String {
    let parsed = published.and_then(|ts| {
        let ts = ts.trim();
        OffsetDateTime::parse(ts, &Rfc2822)
            .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
            .ok()
    });
    let fmt = format_description!("[month repr:short] [year]");
    parsed
        .unwrap_or(now)
        .format(&fmt)
        .unwrap_or_else(|_| "Recent".to_string())
}

/// Fetch every source concurrently. A failing source is logged and contributes
/// zero items; the result keeps source order, then feed order, with a running
/// positional index.
pub async fn fetch_all(providers: &[Arc<dyn FeedProvider>]) -> Vec<SourcedItem> {
    ensure_metrics_described();

    let results = join_all(providers.iter().map(|p| async move {
        let res = p.fetch_latest().await;
        (p.source().name.clone(), res)
    }))
    .await;

    let mut out = Vec::new();
    for (source_name, res) in results {
        match res {
            Ok(items) => {
                tracing::debug!(target: "ingest", source = %source_name, count = items.len(), "feed fetched");
                counter!("discovery_feed_items_total").increment(items.len() as u64);
                for item in items {
                    let index = out.len();
                    out.push(SourcedItem {
                        source_name: source_name.clone(),
                        index,
                        item,
                    });
                }
            }
            Err(e) => {
                tracing::warn!(target: "ingest", source = %source_name, kind = e.kind(), "RSS failed: {source_name}: {e}");
                counter!("discovery_source_errors_total", "kind" => e.kind()).increment(1);
            }
        }
    }

    tracing::info!(target: "ingest", items = out.len(), sources = providers.len(), "RSS fetch done");
    out
}
