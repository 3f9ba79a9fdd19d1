mod common;

use common::standard_sources;
use discovery_monitor::ingest::fetch_all;
use discovery_monitor::relevance::RelevanceGate;

#[tokio::test]
async fn syndicated_title_reaches_the_classifier_once() {
    let items = fetch_all(&standard_sources()).await;
    let (candidates, stats) = RelevanceGate::default().filter(items);

    let lenacapavir: Vec<_> = candidates
        .iter()
        .filter(|c| c.title.to_lowercase() == "who recommends lenacapavir for hiv prevention")
        .collect();
    assert_eq!(lenacapavir.len(), 1);
    // first seen wins: the RSS copy, not the Atom one
    assert_eq!(lenacapavir[0].source_name, "UNAIDS");
    assert_eq!(stats.duplicate, 1);
}

#[tokio::test]
async fn off_topic_items_are_gated_and_order_is_kept() {
    let items = fetch_all(&standard_sources()).await;
    let (candidates, stats) = RelevanceGate::default().filter(items);

    let titles: Vec<_> = candidates.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Namibia reaches 95-95-95 HIV targets",
            "Program X set to lose funding for HIV services",
            "WHO recommends lenacapavir for HIV prevention",
            "Long-acting cabotegravir rollout expands in Zambia",
        ]
    );
    assert_eq!(stats.off_topic, 1);
    assert_eq!(stats.kept, 4);
}

#[tokio::test]
async fn summaries_are_plain_text() {
    let items = fetch_all(&standard_sources()).await;
    let (candidates, _) = RelevanceGate::default().filter(items);
    for c in &candidates {
        assert!(!c.summary.contains('<'), "markup left in {:?}", c.summary);
        assert!(c.summary.chars().count() <= 400);
    }
    assert!(candidates[0].summary.starts_with("Namibia has achieved the UNAIDS 95-95-95"));
}
