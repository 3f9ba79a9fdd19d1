// src/ingest/providers/rss.rs
//! Generic RSS 2.0 / RSS 1.0 (RDF) / Atom provider. Only title, link,
//! content/snippet and publish date are read.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::FetchConfig;
use crate::ingest::clean_title;
use crate::ingest::types::{FeedProvider, FeedSource, FetchError, RawFeedItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    /// RSS 2.0 and RSS 1.0 (RDF) share item field names.
    Rss,
    Atom,
}

impl FeedKind {
    fn item_tag(self) -> &'static [u8] {
        match self {
            FeedKind::Rss => b"item",
            FeedKind::Atom => b"entry",
        }
    }

    /// Item child elements whose text we keep, by local name.
    fn field(self, local: &[u8]) -> Option<Field> {
        match (self, local) {
            (_, b"title") => Some(Field::Title),
            (FeedKind::Rss, b"link") => Some(Field::Link),
            (FeedKind::Rss, b"description") | (FeedKind::Atom, b"summary") => Some(Field::Description),
            (FeedKind::Rss, b"encoded") | (FeedKind::Atom, b"content") => Some(Field::Content),
            (FeedKind::Rss, b"pubDate") | (FeedKind::Atom, b"published") => Some(Field::Published),
            (FeedKind::Rss, b"date") | (FeedKind::Atom, b"updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    Content,
    Published,
    Updated,
}

#[derive(Debug, Default)]
struct AtomLink {
    href: Option<String>,
    rel: Option<String>,
}

impl AtomLink {
    fn from_element(e: &BytesStart<'_>) -> Self {
        let mut link = AtomLink::default();
        for attr in e.attributes().flatten() {
            let value = attr.unescape_value().ok().map(|v| v.into_owned());
            match attr.key.local_name().as_ref() {
                b"href" => link.href = value,
                b"rel" => link.rel = value,
                _ => {}
            }
        }
        link
    }
}

/// One item while its children stream past. Repeated fields keep the first
/// non-blank value.
#[derive(Debug, Default)]
struct ItemDraft {
    title: Option<String>,
    link: Option<String>,
    atom_links: Vec<AtomLink>,
    description: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl ItemDraft {
    fn set(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Content => &mut self.content,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        };
        if slot.is_none() && !text.trim().is_empty() {
            *slot = Some(text);
        }
    }

    fn into_raw(self, kind: FeedKind) -> RawFeedItem {
        let link = match kind {
            FeedKind::Rss => self.link,
            FeedKind::Atom => self
                .atom_links
                .iter()
                .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                .or_else(|| self.atom_links.first())
                .and_then(|l| l.href.clone()),
        };
        RawFeedItem {
            title: clean_title(self.title.as_deref().unwrap_or_default()),
            link: non_blank(link),
            summary_html: self.content.or(self.description).unwrap_or_default(),
            published_at: non_blank(self.published.or(self.updated)),
        }
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Named HTML entities are common in feed bodies but invalid in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

fn invalid_xml(reason: &str) -> FetchError {
    FetchError::InvalidXml(truncate_reason(reason))
}

/// Local name of the document's root element.
fn root_element(xml: &str) -> Result<String, FetchError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
            }
            Ok(Event::Eof) => return Err(FetchError::InvalidXml("empty document".into())),
            Ok(_) => continue,
            Err(e) => return Err(invalid_xml(&e.to_string())),
        }
    }
}

fn truncate_reason(s: &str) -> String {
    s.chars().take(60).collect()
}

/// Stream the document once. Field text is everything textual below the field
/// element, so inline markup (`<title>HIV <i>a</i></title>`) and xhtml content
/// collapse to their text instead of failing the feed.
fn read_items(xml: &str, kind: FeedKind) -> Result<Vec<RawFeedItem>, FetchError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut depth = 0usize;
    // (depth of the item element, fields so far)
    let mut draft: Option<(usize, ItemDraft)> = None;
    // (depth of the field element, field, collected text)
    let mut capture: Option<(usize, Field, String)> = None;

    loop {
        match reader.read_event().map_err(|e| invalid_xml(&e.to_string()))? {
            Event::Start(e) => {
                depth += 1;
                match draft.as_mut() {
                    None => {
                        if e.local_name().as_ref() == kind.item_tag() {
                            draft = Some((depth, ItemDraft::default()));
                        }
                    }
                    Some((item_depth, d)) if capture.is_none() && depth == *item_depth + 1 => {
                        let local = e.local_name();
                        if kind == FeedKind::Atom && local.as_ref() == b"link" {
                            d.atom_links.push(AtomLink::from_element(&e));
                        } else if let Some(field) = kind.field(local.as_ref()) {
                            capture = Some((depth, field, String::new()));
                        }
                    }
                    Some(_) => {}
                }
            }
            Event::Empty(e) => {
                if let Some((item_depth, d)) = draft.as_mut() {
                    if kind == FeedKind::Atom
                        && capture.is_none()
                        && depth == *item_depth
                        && e.local_name().as_ref() == b"link"
                    {
                        d.atom_links.push(AtomLink::from_element(&e));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, buf)) = capture.as_mut() {
                    match t.unescape() {
                        Ok(text) => buf.push_str(&text),
                        Err(_) => buf.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, _, buf)) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                if capture.as_ref().is_some_and(|(at, _, _)| *at == depth) {
                    if let (Some((_, field, text)), Some((_, d))) = (capture.take(), draft.as_mut()) {
                        d.set(field, text);
                    }
                }
                if draft.as_ref().is_some_and(|(at, _)| *at == depth) {
                    if let Some((_, d)) = draft.take() {
                        items.push(d.into_raw(kind));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(invalid_xml("unexpected end of document"));
                }
                break;
            }
            _ => {}
        }
    }
    Ok(items)
}

/// Parse a feed document into raw items (feed order, uncapped).
pub fn parse_feed(xml: &str) -> Result<Vec<RawFeedItem>, FetchError> {
    let t0 = Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml.trim_start_matches('\u{feff}'));

    let kind = match root_element(&xml_clean)?.as_str() {
        "rss" | "RDF" => FeedKind::Rss,
        "feed" => FeedKind::Atom,
        other => {
            return Err(FetchError::InvalidXml(format!(
                "unsupported root element <{}>",
                truncate_reason(other)
            )))
        }
    };
    let items = read_items(&xml_clean, kind)?;

    histogram!("discovery_feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(items)
}

/// Shared client: descriptive User-Agent and the per-request timeout.
pub fn build_http_client(cfg: &FetchConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.timeout())
        .build()
        .context("building feed http client")
}

fn classify_reqwest_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        return FetchError::Timeout;
    }
    if let Some(status) = e.status() {
        return status_error(status.as_u16());
    }
    // DNS failures only show up in the source chain text.
    let mut chain = e.to_string();
    let mut src = std::error::Error::source(e);
    while let Some(inner) = src {
        chain.push_str(": ");
        chain.push_str(&inner.to_string());
        src = std::error::Error::source(inner);
    }
    let lower = chain.to_ascii_lowercase();
    if lower.contains("dns error")
        || lower.contains("failed to lookup address")
        || lower.contains("name or service not known")
        || lower.contains("no such host")
    {
        return FetchError::HostNotFound;
    }
    FetchError::Transport(truncate_reason(&chain))
}

fn status_error(code: u16) -> FetchError {
    if code == 404 {
        FetchError::NotFound
    } else {
        FetchError::HttpStatus(code)
    }
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        timeout: Duration,
    },
}

pub struct RssFeedProvider {
    source: FeedSource,
    mode: Mode,
    max_items: usize,
}

impl RssFeedProvider {
    /// Serve a fixed document instead of fetching (tests, offline runs).
    pub fn from_fixture(source: FeedSource, xml: &str) -> Self {
        Self {
            source,
            mode: Mode::Fixture(xml.to_string()),
            max_items: FetchConfig::default().max_items_per_source,
        }
    }

    pub fn from_http(source: FeedSource, client: reqwest::Client, cfg: &FetchConfig) -> Self {
        Self {
            source,
            mode: Mode::Http {
                client,
                timeout: cfg.timeout(),
            },
            max_items: cfg.max_items_per_source,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    async fn fetch_body(&self, client: &reqwest::Client) -> Result<String, FetchError> {
        let resp = client
            .get(&self.source.url)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(status_error(status.as_u16()));
        }
        resp.text().await.map_err(|e| classify_reqwest_error(&e))
    }
}

#[async_trait]
impl FeedProvider for RssFeedProvider {
    fn source(&self) -> &FeedSource {
        &self.source
    }

    async fn fetch_latest(&self) -> Result<Vec<RawFeedItem>, FetchError> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { client, timeout } => {
                // Race the whole request (headers + body) against the timer.
                match tokio::time::timeout(*timeout, self.fetch_body(client)).await {
                    Ok(r) => r?,
                    Err(_) => return Err(FetchError::Timeout),
                }
            }
        };
        let mut items = parse_feed(&body)?;
        items.truncate(self.max_items);
        Ok(items)
    }
}
