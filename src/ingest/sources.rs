// src/ingest/sources.rs
//! Static feed registry and provider construction.

use std::sync::Arc;

use anyhow::Result;

use crate::config::FetchConfig;
use crate::ingest::providers::rss::{build_http_client, RssFeedProvider};
use crate::ingest::types::{FeedProvider, FeedSource};

/// Public feeds polled when the config lists no `[[sources]]`.
pub const DEFAULT_SOURCES: &[(&str, &str)] = &[
    (
        "Google News (trials & research)",
        "https://news.google.com/rss/search?q=HIV+clinical+trial+vaccine+research+treatment&hl=en-US&gl=US&ceid=US:en",
    ),
    (
        "WHO Africa (health)",
        "https://www.afro.who.int/rss/featured-news.xml",
    ),
    ("WHO HIV", "https://www.who.int/feeds/entity/hiv/en/feed.xml"),
    ("UNAIDS", "https://www.unaids.org/en/feeds/news"),
    ("HIV.gov", "https://www.hiv.gov/blog/rss-feed"),
];

pub fn default_sources() -> Vec<FeedSource> {
    DEFAULT_SOURCES
        .iter()
        .map(|(name, url)| FeedSource::new(*name, *url))
        .collect()
}

/// One HTTP provider per source, sharing a single client.
pub fn build_http_providers(
    sources: &[FeedSource],
    cfg: &FetchConfig,
) -> Result<Vec<Arc<dyn FeedProvider>>> {
    let client = build_http_client(cfg)?;
    Ok(sources
        .iter()
        .cloned()
        .map(|s| Arc::new(RssFeedProvider::from_http(s, client.clone(), cfg)) as Arc<dyn FeedProvider>)
        .collect())
}
