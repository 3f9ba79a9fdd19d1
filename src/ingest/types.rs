// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// A named RSS/Atom endpoint. Identity is `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One parsed feed entry. Lives only for a single fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: String,
    pub link: Option<String>,
    pub summary_html: String,
    pub published_at: Option<String>, // raw RFC 2822 / RFC 3339 string from the feed
}

/// A raw item tagged with its originating source and its position in the
/// combined (source-then-feed order) list of this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedItem {
    pub source_name: String,
    pub index: usize,
    pub item: RawFeedItem,
}

/// Per-source fetch failure, classified for logs and metrics. Never escapes
/// the fetch stage.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("404 (feed unavailable)")]
    NotFound,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("host not found")]
    HostNotFound,
    #[error("timeout")]
    Timeout,
    #[error("invalid XML: {0}")]
    InvalidXml(String),
    #[error("transport: {0}")]
    Transport(String),
}

impl FetchError {
    /// Short, stable label (metrics label value).
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound => "not_found",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::HostNotFound => "dns",
            FetchError::Timeout => "timeout",
            FetchError::InvalidXml(_) => "invalid_xml",
            FetchError::Transport(_) => "transport",
        }
    }
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    fn source(&self) -> &FeedSource;
    async fn fetch_latest(&self) -> Result<Vec<RawFeedItem>, FetchError>;
}
