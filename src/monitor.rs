// src/monitor.rs
//! Orchestrator: cache check, then fetch -> filter -> classify -> normalize ->
//! write snapshot. Never fails past its own boundary; a failed run serves the
//! last snapshot regardless of age, or an empty list.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::FutureExt;
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::analyze::degraded::degraded_card;
use crate::analyze::{build_classifier, BatchClassifier, CardNormalizer, DynClassifier};
use crate::card::{DiscoveryCard, Snapshot};
use crate::config::MonitorConfig;
use crate::ingest::sources::build_http_providers;
use crate::ingest::types::FeedProvider;
use crate::ingest::{ensure_metrics_described, fetch_all};
use crate::relevance::RelevanceGate;
use crate::snapshot::SnapshotCache;

/// Where a returned list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrigin {
    Cache,
    Fresh,
    Stale,
}

impl FeedOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedOrigin::Cache => "cache",
            FeedOrigin::Fresh => "fresh",
            FeedOrigin::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoveryFeed {
    pub discoveries: Vec<DiscoveryCard>,
    pub origin: FeedOrigin,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct DiscoveryMonitor {
    providers: Vec<Arc<dyn FeedProvider>>,
    gate: RelevanceGate,
    classifier: BatchClassifier,
    cache: SnapshotCache,
    keep_snapshot_on_empty: bool,
}

impl DiscoveryMonitor {
    pub fn new(
        providers: Vec<Arc<dyn FeedProvider>>,
        classifier: DynClassifier,
        cfg: &MonitorConfig,
    ) -> Self {
        Self {
            providers,
            gate: RelevanceGate::new(&cfg.relevance, cfg.pipeline.summary_max_chars),
            classifier: BatchClassifier::new(classifier, &cfg.pipeline),
            cache: SnapshotCache::new(cfg.cache.path.clone(), cfg.cache.ttl()),
            keep_snapshot_on_empty: cfg.cache.keep_snapshot_on_empty,
        }
    }

    /// HTTP feed providers and the configured classifier.
    pub fn from_config(cfg: &MonitorConfig) -> Result<Self> {
        let providers =
            build_http_providers(&cfg.sources, &cfg.fetch).context("building feed providers")?;
        let classifier = build_classifier(&cfg.classifier).context("building classifier")?;
        tracing::info!(
            target: "monitor",
            sources = providers.len(),
            provider = classifier.provider_name(),
            classifier_ready = classifier.is_configured(),
            "discovery monitor ready"
        );
        Ok(Self::new(providers, classifier, cfg))
    }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.classifier = self.classifier.with_timeout(timeout);
        self
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// The list only; see [`DiscoveryMonitor::fetch`] for its origin.
    pub async fn get_latest_discoveries(&self, force: bool) -> Vec<DiscoveryCard> {
        self.fetch(force).await.discoveries
    }

    pub async fn fetch(&self, force: bool) -> DiscoveryFeed {
        ensure_metrics_described();

        if !force {
            if let Some(snap) = self.cache.read().await {
                if self.cache.is_fresh(&snap, now_ms()) {
                    tracing::info!(target: "monitor", count = snap.discoveries.len(), "cache hit");
                    counter!("discovery_cache_hits_total").increment(1);
                    return DiscoveryFeed {
                        discoveries: snap.discoveries,
                        origin: FeedOrigin::Cache,
                    };
                }
            }
        }

        tracing::info!(target: "monitor", force, "refreshing discoveries");
        let started = Instant::now();
        let failure = match AssertUnwindSafe(self.refresh()).catch_unwind().await {
            Ok(discoveries) => {
                histogram!("discovery_refresh_ms").record(started.elapsed().as_secs_f64() * 1000.0);
                return DiscoveryFeed {
                    discoveries,
                    origin: FeedOrigin::Fresh,
                };
            }
            Err(panic) => panic_message(panic.as_ref()),
        };

        tracing::warn!(target: "monitor", reason = %failure, "refresh failed, serving last snapshot");
        counter!("discovery_stale_fallback_total").increment(1);
        let discoveries = self
            .cache
            .read()
            .await
            .map(|s| s.discoveries)
            .unwrap_or_default();
        tracing::info!(target: "monitor", count = discoveries.len(), "returning cached fallback");
        DiscoveryFeed {
            discoveries,
            origin: FeedOrigin::Stale,
        }
    }

    /// Fetch, gate, classify, normalize, persist. Recoverable failures are
    /// absorbed stage by stage; only a panic escapes to [`Self::fetch`].
    async fn refresh(&self) -> Vec<DiscoveryCard> {
        let items = fetch_all(&self.providers).await;
        let (candidates, _stats) = self.gate.filter(items);

        let now = now_ms();
        let mut normalizer = CardNormalizer::new(now);
        let use_classifier = self.classifier.is_available();

        let discoveries: Vec<DiscoveryCard> = if use_classifier {
            self.classifier
                .classify_all(candidates)
                .await
                .into_iter()
                .filter_map(|(ctx, raw)| raw.and_then(|r| normalizer.normalize(r, &ctx, &self.gate)))
                .collect()
        } else {
            tracing::info!(target: "monitor", candidates = candidates.len(), "no classifier configured, using rule-based cards");
            let at = normalizer.now();
            candidates
                .iter()
                .filter_map(|ctx| normalizer.normalize(degraded_card(ctx, at), ctx, &self.gate))
                .collect()
        };

        counter!("discovery_cards_total").increment(discoveries.len() as u64);
        gauge!("discovery_last_refresh_ts").set((now / 1000) as f64);
        tracing::info!(
            target: "monitor",
            discoveries = discoveries.len(),
            classifier = use_classifier,
            "fetch complete"
        );

        if discoveries.is_empty() && self.keep_snapshot_on_empty {
            tracing::info!(target: "monitor", "empty result, keeping previous snapshot");
        } else {
            self.cache
                .write(&Snapshot {
                    timestamp: now,
                    discoveries: discoveries.clone(),
                })
                .await;
        }

        discoveries
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
