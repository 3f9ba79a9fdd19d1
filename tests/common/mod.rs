// tests/common/mod.rs
//
// Shared doubles for integration tests: fixture feeds, counting / panicking
// providers and a scripted classifier. No live network anywhere.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use discovery_monitor::analyze::{Classifier, ClassifyError};
use discovery_monitor::ingest::providers::rss::RssFeedProvider;
use discovery_monitor::ingest::types::{FeedProvider, FeedSource, FetchError, RawFeedItem};
use discovery_monitor::MonitorConfig;

pub const UNAIDS_RSS: &str = include_str!("../fixtures/unaids_rss.xml");
pub const WHO_ATOM: &str = include_str!("../fixtures/who_hiv_atom.xml");
pub const BROKEN_XML: &str = include_str!("../fixtures/broken.xml");

pub fn fixture(name: &str, xml: &str) -> Arc<dyn FeedProvider> {
    Arc::new(RssFeedProvider::from_fixture(
        FeedSource::new(name, format!("https://{}.test/feed", name.to_lowercase())),
        xml,
    ))
}

/// UNAIDS (RSS), a malformed feed, WHO HIV (Atom), in that order.
pub fn standard_sources() -> Vec<Arc<dyn FeedProvider>> {
    vec![
        fixture("UNAIDS", UNAIDS_RSS),
        fixture("Broken", BROKEN_XML),
        fixture("WHO HIV", WHO_ATOM),
    ]
}

/// Config whose snapshot lives under `dir`.
pub fn test_config(dir: &Path) -> MonitorConfig {
    let mut cfg = MonitorConfig::default();
    cfg.cache.path = dir.join("data").join("discoveryCache.json");
    cfg
}

pub struct CountingProvider {
    inner: Arc<dyn FeedProvider>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn wrap(inner: Arc<dyn FeedProvider>) -> (Arc<dyn FeedProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let p = Arc::new(Self {
            inner,
            calls: calls.clone(),
        });
        (p, calls)
    }
}

#[async_trait]
impl FeedProvider for CountingProvider {
    fn source(&self) -> &FeedSource {
        self.inner.source()
    }

    async fn fetch_latest(&self) -> Result<Vec<RawFeedItem>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_latest().await
    }
}

/// Simulates a programming fault deep inside the pipeline.
pub struct PanickingProvider {
    source: FeedSource,
}

impl PanickingProvider {
    pub fn new() -> Arc<dyn FeedProvider> {
        Arc::new(Self {
            source: FeedSource::new("Faulty", "https://faulty.test/feed"),
        })
    }
}

#[async_trait]
impl FeedProvider for PanickingProvider {
    fn source(&self) -> &FeedSource {
        &self.source
    }

    async fn fetch_latest(&self) -> Result<Vec<RawFeedItem>, FetchError> {
        panic!("provider exploded");
    }
}

#[derive(Clone)]
pub enum Script {
    /// Accept every item as a card built from its Title/URL lines.
    AcceptAll,
    /// Return this text verbatim.
    Reply(String),
    /// Transport failure.
    Fail,
}

pub struct ScriptedClassifier {
    script: Script,
    delay: Option<Duration>,
    configured: bool,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: None,
            configured: true,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every "Title:" line the classifier has been shown, in call order.
    pub fn seen_titles(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .flat_map(|p| titles_in(p))
            .collect()
    }
}

fn titles_in(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|l| l.strip_prefix("Title: "))
        .map(str::to_string)
        .collect()
}

fn accept_all(prompt: &str) -> String {
    let urls: Vec<&str> = prompt
        .lines()
        .filter_map(|l| l.strip_prefix("URL: "))
        .collect();
    let results: Vec<_> = titles_in(prompt)
        .into_iter()
        .zip(urls)
        .map(|(title, url)| {
            json!({ "card": {
                "title": title,
                "summary": format!("{title}. HIV programme news."),
                "discovery_type": "Clinical Trial",
                "country_or_region": "Southern Africa",
                "sources": [url],
            }})
        })
        .collect();
    // Fenced on purpose: real models do this.
    format!("```json\n{}\n```", json!({ "results": results }))
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn classify(&self, prompt: &str, _system: &str) -> Result<String, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.script {
            Script::AcceptAll => Ok(accept_all(prompt)),
            Script::Reply(text) => Ok(text.clone()),
            Script::Fail => Err(ClassifyError::Transport("connection reset".into())),
        }
    }
}
