// tests/monitor_pipeline.rs
//
// End-to-end orchestrator behaviour over fixture feeds and scripted
// classifiers: source isolation, dedup, degraded mode, cache reuse, forced
// refresh, stale fallback.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    fixture, standard_sources, test_config, CountingProvider, PanickingProvider, Script,
    ScriptedClassifier, UNAIDS_RSS,
};
use discovery_monitor::analyze::ai_adapter::DisabledClassifier;
use discovery_monitor::analyze::DynClassifier;
use discovery_monitor::card::{DiscoveryCard, DiscoveryType, Snapshot};
use discovery_monitor::monitor::now_ms;
use discovery_monitor::snapshot::SnapshotCache;
use discovery_monitor::{DiscoveryMonitor, FeedOrigin};

fn disabled() -> DynClassifier {
    Arc::new(DisabledClassifier)
}

fn old_card() -> DiscoveryCard {
    DiscoveryCard {
        id: "old-card".into(),
        title: "Earlier HIV discovery".into(),
        country_or_region: "Global".into(),
        discovery_type: DiscoveryType::Research,
        summary: "Kept from a previous run.".into(),
        why_this_matters: "Continuity.".into(),
        date_announced: "Jan 2025".into(),
        sources: vec!["UNAIDS".into()],
        source_labels: vec!["UNAIDS".into()],
        confidence_basis: "RSS feed: UNAIDS".into(),
    }
}

async fn seed_snapshot(cache: &SnapshotCache, timestamp: i64) {
    assert!(
        cache
            .write(&Snapshot {
                timestamp,
                discoveries: vec![old_card()],
            })
            .await
    );
}

#[tokio::test]
async fn degraded_mode_survives_a_broken_source() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = DiscoveryMonitor::new(standard_sources(), disabled(), &test_config(dir.path()));

    let feed = monitor.fetch(false).await;
    assert_eq!(feed.origin, FeedOrigin::Fresh);

    let titles: Vec<_> = feed.discoveries.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Namibia reaches 95-95-95 HIV targets",
            "WHO recommends lenacapavir for HIV prevention",
            "Long-acting cabotegravir rollout expands in Zambia",
        ]
    );
    for card in &feed.discoveries {
        assert!(card.labels_aligned());
        assert_eq!(card.country_or_region, "Global");
        assert_eq!(card.discovery_type, DiscoveryType::Research);
        assert!(card.confidence_basis.starts_with("RSS feed: "));
    }
    assert_eq!(feed.discoveries[0].date_announced, "Aug 2025");
    assert_eq!(feed.discoveries[2].sources, vec!["https://who.test/news/zambia-cab-la"]);
    assert_eq!(feed.discoveries[2].source_labels, vec!["WHO HIV"]);

    let snap = monitor.cache().read().await.expect("snapshot written");
    assert_eq!(snap.discoveries, feed.discoveries);
}

#[tokio::test]
async fn classifier_mode_dedups_and_drops_funding_cuts() {
    let dir = tempfile::tempdir().unwrap();
    let scripted = Arc::new(ScriptedClassifier::new(Script::AcceptAll));
    let dynamic: DynClassifier = scripted.clone();
    let monitor = DiscoveryMonitor::new(standard_sources(), dynamic, &test_config(dir.path()));

    let cards = monitor.get_latest_discoveries(true).await;

    // syndicated story shown to the model once
    let seen = scripted.seen_titles();
    let lenacapavir = seen
        .iter()
        .filter(|t| t.to_lowercase() == "who recommends lenacapavir for hiv prevention")
        .count();
    assert_eq!(lenacapavir, 1);
    assert_eq!(seen.len(), 4);
    assert_eq!(scripted.calls(), 1);

    // the model accepted everything; the funding-cut story still never lands
    assert_eq!(cards.len(), 3);
    assert!(cards.iter().all(|c| !c.title.contains("lose funding")));
    for card in &cards {
        assert!(card.labels_aligned());
        assert_eq!(card.discovery_type, DiscoveryType::ClinicalTrial);
        assert_eq!(card.country_or_region, "Southern Africa");
    }
    let ids: std::collections::HashSet<_> = cards.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), cards.len());
}

#[tokio::test]
async fn second_call_within_ttl_does_no_io() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, fetches) = CountingProvider::wrap(fixture("UNAIDS", UNAIDS_RSS));
    let scripted = Arc::new(ScriptedClassifier::new(Script::AcceptAll));
    let dynamic: DynClassifier = scripted.clone();
    let monitor = DiscoveryMonitor::new(vec![provider], dynamic, &test_config(dir.path()));

    let first = monitor.fetch(false).await;
    assert_eq!(first.origin, FeedOrigin::Fresh);
    let second = monitor.fetch(false).await;
    assert_eq!(second.origin, FeedOrigin::Cache);

    assert_eq!(first.discoveries, second.discoveries);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(scripted.calls(), 1);
}

#[tokio::test]
async fn forced_refresh_bypasses_fresh_cache_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, fetches) = CountingProvider::wrap(fixture("UNAIDS", UNAIDS_RSS));
    let monitor = DiscoveryMonitor::new(vec![provider], disabled(), &test_config(dir.path()));
    seed_snapshot(monitor.cache(), now_ms()).await;

    let cached = monitor.fetch(false).await;
    assert_eq!(cached.origin, FeedOrigin::Cache);
    assert_eq!(cached.discoveries, vec![old_card()]);
    assert_eq!(fetches.load(Ordering::SeqCst), 0);

    let forced = monitor.fetch(true).await;
    assert_eq!(forced.origin, FeedOrigin::Fresh);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(forced.discoveries.len(), 2);

    let snap = monitor.cache().read().await.unwrap();
    assert_eq!(snap.discoveries, forced.discoveries);
}

#[tokio::test]
async fn expired_snapshot_triggers_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, fetches) = CountingProvider::wrap(fixture("UNAIDS", UNAIDS_RSS));
    let monitor = DiscoveryMonitor::new(vec![provider], disabled(), &test_config(dir.path()));
    seed_snapshot(monitor.cache(), now_ms() - 2 * 3_600_000).await;

    let feed = monitor.fetch(false).await;
    assert_eq!(feed.origin, FeedOrigin::Fresh);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_forced_refresh_overwrites_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = DiscoveryMonitor::new(vec![], disabled(), &test_config(dir.path()));
    seed_snapshot(monitor.cache(), now_ms()).await;

    assert!(monitor.get_latest_discoveries(true).await.is_empty());
    let snap = monitor.cache().read().await.unwrap();
    assert!(snap.discoveries.is_empty());
}

#[tokio::test]
async fn empty_forced_refresh_can_keep_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path());
    cfg.cache.keep_snapshot_on_empty = true;
    let monitor = DiscoveryMonitor::new(vec![], disabled(), &cfg);
    seed_snapshot(monitor.cache(), now_ms()).await;

    assert!(monitor.get_latest_discoveries(true).await.is_empty());
    let snap = monitor.cache().read().await.unwrap();
    assert_eq!(snap.discoveries, vec![old_card()]);
}

#[tokio::test]
async fn no_sources_and_no_snapshot_returns_empty() {
    let dir = tempfile::tempdir().unwrap();
    let broken = vec![fixture("Broken", common::BROKEN_XML)];
    let monitor = DiscoveryMonitor::new(broken, disabled(), &test_config(dir.path()));

    let feed = monitor.fetch(false).await;
    assert!(feed.discoveries.is_empty());
    assert_eq!(feed.origin, FeedOrigin::Fresh);
}

#[tokio::test]
async fn timed_out_batches_produce_no_cards_and_no_error() {
    let dir = tempfile::tempdir().unwrap();
    let slow: DynClassifier = Arc::new(
        ScriptedClassifier::new(Script::AcceptAll).with_delay(Duration::from_secs(5)),
    );
    let monitor = DiscoveryMonitor::new(standard_sources(), slow, &test_config(dir.path()))
        .with_batch_timeout(Duration::from_millis(50));

    let feed = monitor.fetch(true).await;
    assert_eq!(feed.origin, FeedOrigin::Fresh);
    assert!(feed.discoveries.is_empty());
}

#[tokio::test]
async fn panic_in_pipeline_serves_stale_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = DiscoveryMonitor::new(
        vec![PanickingProvider::new()],
        disabled(),
        &test_config(dir.path()),
    );
    // way past the TTL: still served
    seed_snapshot(monitor.cache(), 0).await;

    let feed = monitor.fetch(false).await;
    assert_eq!(feed.origin, FeedOrigin::Stale);
    assert_eq!(feed.discoveries, vec![old_card()]);
}

#[tokio::test]
async fn panic_without_snapshot_returns_empty() {
    let dir = tempfile::tempdir().unwrap();
    let monitor = DiscoveryMonitor::new(
        vec![PanickingProvider::new()],
        disabled(),
        &test_config(dir.path()),
    );

    let feed = monitor.fetch(true).await;
    assert_eq!(feed.origin, FeedOrigin::Stale);
    assert!(feed.discoveries.is_empty());
}

#[tokio::test]
async fn corrupt_snapshot_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path());
    std::fs::create_dir_all(cfg.cache.path.parent().unwrap()).unwrap();
    std::fs::write(&cfg.cache.path, "{ not json").unwrap();

    let (provider, fetches) = CountingProvider::wrap(fixture("UNAIDS", UNAIDS_RSS));
    let monitor = DiscoveryMonitor::new(vec![provider], disabled(), &cfg);

    let feed = monitor.fetch(false).await;
    assert_eq!(feed.origin, FeedOrigin::Fresh);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(feed.discoveries.len(), 2);
}

#[tokio::test]
async fn recoverable_failures_still_count_as_a_fresh_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config(dir.path());
    // parent is a regular file, so the snapshot write fails
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();
    cfg.cache.path = blocker.join("discoveryCache.json");

    let classifier = Arc::new(ScriptedClassifier::new(Script::Fail));
    let monitor = DiscoveryMonitor::new(standard_sources(), classifier.clone(), &cfg);

    let feed = monitor.fetch(true).await;
    assert_eq!(feed.origin, FeedOrigin::Fresh);
    assert!(feed.discoveries.is_empty());
    assert!(classifier.calls() > 0);
    assert!(monitor.cache().read().await.is_none());
}
