// tests/serving_path.rs
//
// The score_and_rank entry point used by the rendering layer: similarity
// boost wiring, cold start, and self-boost suppression.

use chrono::{DateTime, Duration, TimeZone, Utc};

use daily_brief_ranker::store::ItemStore;
use daily_brief_ranker::{
    score_and_rank, ConfigRegistry, FeedbackEvent, Item, MemoryStore, RankConfig, TfidfModel,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 28, 12, 0, 0).unwrap()
}

fn item(source: &str, title: &str, evidence: &str, hours_old: i64) -> Item {
    Item::new(
        source,
        format!("https://example.com/{}", title.replace(' ', "-")),
        now() - Duration::hours(hours_old),
        title,
        evidence,
    )
}

#[test]
fn cold_start_ranks_without_a_model() {
    let registry = ConfigRegistry::new(RankConfig::default());
    let items = vec![
        item("wire", "first plain story", "", 1),
        item("wire", "second plain story", "", 2),
    ];
    let ranked = score_and_rank(&items, &registry, "r1", None, &[], now());
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].item.title, "first plain story");
}

#[test]
fn daily_batch_flows_from_store_to_ranking() {
    let registry = ConfigRegistry::new(RankConfig::default());
    let store = MemoryStore::new();
    store.insert_items(vec![
        item("techcrunch", "startup lands forty million", "", 2),
        item("wire", "city council meeting recap", "", 1),
        item("wire", "yesterday's market wrap", "", 30),
    ]);

    let today = now().date_naive();
    let batch = store.items_by_date(today).unwrap();
    assert_eq!(batch.len(), 2, "only today's items belong to the batch");

    let ranked = score_and_rank(&batch, &registry, "r1", None, &[], now());
    // Keyword boost ("million") + source weight beat mere freshness.
    assert_eq!(ranked[0].item.title, "startup lands forty million");
}

#[test]
fn approved_topic_pulls_similar_items_up() {
    let mut cfg = RankConfig::default();
    cfg.topics.clear();
    cfg.keyword_boosts.clear();
    cfg.similarity_coefficient = 0.2;
    let registry = ConfigRegistry::new(cfg);

    // Same source, same age: only the boost separates the pair.
    let kernel = item("wire", "kernel scheduler patch series merged", "", 2);
    let gardening = item("wire", "community gardening weekend roundup", "", 2);

    let store = MemoryStore::new();
    let liked = item(
        "wire",
        "kernel memory management patches land",
        "scheduler and memory work",
        30,
    );
    let liked_key = liked.dedupe_key.clone();
    store.insert_items(vec![liked.clone(), kernel.clone(), gardening.clone()]);
    store.record_feedback(FeedbackEvent {
        reader: "r1".into(),
        item: liked_key,
        source: "wire".into(),
        useful: true,
        at: now() - Duration::days(1),
    });

    let corpus = store.all_historical_items(now().date_naive()).unwrap();
    let positives = store.positive_items("r1", now().date_naive()).unwrap();
    let model = TfidfModel::fit(&corpus).expect("non-empty corpus");

    let ranked = score_and_rank(
        &[gardening.clone(), kernel.clone()],
        &registry,
        "r1",
        Some(&model),
        &positives,
        now(),
    );
    assert_eq!(ranked[0].item.id, kernel.id);
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn already_approved_item_gets_no_self_boost() {
    let mut cfg = RankConfig::default();
    cfg.topics.clear();
    cfg.keyword_boosts.clear();
    cfg.similarity_coefficient = 0.2;
    let registry = ConfigRegistry::new(cfg);

    let liked = item("wire", "database indexing deep dive", "", 2);
    let fresh = item("wire", "database indexing deep dive part two", "", 2);

    let store = MemoryStore::new();
    store.insert_items(vec![liked.clone(), fresh.clone()]);
    store.record_feedback(FeedbackEvent {
        reader: "r1".into(),
        item: liked.dedupe_key.clone(),
        source: "wire".into(),
        useful: true,
        at: now() - Duration::hours(3),
    });

    let corpus = store.all_historical_items(now().date_naive()).unwrap();
    let positives = store.positive_items("r1", now().date_naive()).unwrap();
    let model = TfidfModel::fit(&corpus).expect("non-empty corpus");

    // The already-liked item reappears as a candidate: its similarity must
    // be suppressed to zero, so the near-duplicate follow-up outranks it
    // (same base score, positive boost).
    let ranked = score_and_rank(
        &[liked.clone(), fresh.clone()],
        &registry,
        "r1",
        Some(&model),
        &positives,
        now(),
    );
    assert_eq!(ranked[0].item.id, fresh.id);
}
