//! # Scorer
//!
//! Deterministic per-item scoring and total-order ranking.
//!
//! ```text
//! recency  = 1 / (1 + age_hours / half_life)        (half_life <= 0 -> 24.0)
//! relevance = topic matches + keyword boosts
//! base     = (1.0 + relevance) * source_weight * recency
//! final    = base + similarity_coefficient * similarity_score
//! ```
//!
//! Ordering: final desc, then `published_at` desc, then original ingestion
//! index asc. The index tie-break makes two runs over the same input
//! byte-for-byte identical, which everything downstream (evals, snapshots,
//! regression gating) relies on.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::{RankConfig, SearchField, DEFAULT_HALF_LIFE_HOURS};
use crate::item::Item;

/// All components of a score, for both scoring and explainability.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreBreakdown {
    pub matched_topics: Vec<String>,
    /// (keyword, boost) pairs that hit.
    pub matched_keywords: Vec<(String, f32)>,
    pub source_weight: f32,
    pub age_hours: f32,
    pub recency_decay: f32,
    pub relevance: f32,
    pub similarity: f32,
    pub total: f32,
}

/// An item with its final score, as produced by [`rank_items`].
#[derive(Debug, Clone)]
pub struct RankedItem {
    pub item: Item,
    pub score: f32,
}

fn search_text(item: &Item, cfg: &RankConfig) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(2);
    if cfg.search_fields.contains(&SearchField::Title) {
        parts.push(&item.title);
    }
    if cfg.search_fields.contains(&SearchField::Evidence) {
        parts.push(&item.evidence);
    }
    parts.join(" ").to_lowercase()
}

/// Compute every score component for one item.
///
/// `similarity` is the booster output for this item, or 0.0 when absent;
/// a missing similarity score is scoring-neutral, never an error.
pub fn score_breakdown(
    item: &Item,
    now: DateTime<Utc>,
    cfg: &RankConfig,
    similarity: f32,
) -> ScoreBreakdown {
    // Recency: clock skew can make items appear from the future; clamp to 0.
    let age_secs = (now - item.published_at).num_seconds() as f32;
    let age_hours = (age_secs / 3600.0).max(0.0);

    let mut half_life = cfg.recency_half_life_hours;
    if half_life <= 0.0 {
        half_life = DEFAULT_HALF_LIFE_HOURS;
    }
    let recency_decay = 1.0 / (1.0 + age_hours / half_life);

    // Topic and keyword matching over the configured fields.
    let text = search_text(item, cfg);
    let mut matched_topics = Vec::new();
    for topic in &cfg.topics {
        let t = topic.trim().to_lowercase();
        if !t.is_empty() && text.contains(&t) {
            matched_topics.push(topic.clone());
        }
    }

    let mut matched_keywords = Vec::new();
    for (kw, &boost) in &cfg.keyword_boosts {
        let k = kw.trim().to_lowercase();
        if !k.is_empty() && text.contains(&k) {
            matched_keywords.push((kw.clone(), boost));
        }
    }

    let source_weight = cfg.source_weight(&item.source);
    let relevance = matched_topics.len() as f32
        + matched_keywords.iter().map(|(_, b)| *b).sum::<f32>();

    let base = (1.0 + relevance) * source_weight * recency_decay;
    let total = base + cfg.similarity_coefficient * similarity;

    ScoreBreakdown {
        matched_topics,
        matched_keywords,
        source_weight,
        age_hours,
        recency_decay,
        relevance,
        similarity,
        total,
    }
}

/// Final score for a single item.
pub fn score_item(item: &Item, now: DateTime<Utc>, cfg: &RankConfig, similarity: f32) -> f32 {
    score_breakdown(item, now, cfg, similarity).total
}

/// Rank a day's items. `similarity_scores` maps item id → booster output;
/// items absent from the map get 0.0.
///
/// Sort: score desc, `published_at` desc, ingestion index asc. Scores are
/// finite by construction, so the `partial_cmp` fallback to `Equal` only
/// defends against NaN ever sneaking in; the index still totalizes the order.
pub fn rank_items(
    items: &[Item],
    now: DateTime<Utc>,
    cfg: &RankConfig,
    similarity_scores: &HashMap<String, f32>,
) -> Vec<RankedItem> {
    let mut scored: Vec<(f32, DateTime<Utc>, usize, &Item)> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let sim = similarity_scores.get(&item.id).copied().unwrap_or(0.0);
            (score_item(item, now, cfg, sim), item.published_at, idx, item)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    scored
        .into_iter()
        .map(|(score, _, _, item)| RankedItem {
            item: item.clone(),
            score,
        })
        .collect()
}

/// Full breakdown for one item, for display and eval mismatch diagnostics.
pub fn explain_item(
    item: &Item,
    now: DateTime<Utc>,
    cfg: &RankConfig,
    similarity_scores: &HashMap<String, f32>,
) -> ScoreBreakdown {
    let sim = similarity_scores.get(&item.id).copied().unwrap_or(0.0);
    score_breakdown(item, now, cfg, sim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 14, 23, 59, 59).unwrap()
    }

    fn item(source: &str, title: &str, age_hours: i64) -> Item {
        Item::new(
            source,
            format!("https://example.com/{}", title.replace(' ', "-")),
            now() - Duration::hours(age_hours),
            title,
            "",
        )
    }

    #[test]
    fn fresh_item_scores_higher_than_stale() {
        let cfg = RankConfig::default();
        let fresh = item("wire", "plain story one", 1);
        let stale = item("wire", "plain story two", 48);
        let empty = HashMap::new();
        assert!(score_item(&fresh, now(), &cfg, 0.0) > score_item(&stale, now(), &cfg, 0.0));
        let ranked = rank_items(&[stale, fresh], now(), &cfg, &empty);
        assert_eq!(ranked[0].item.title, "plain story one");
    }

    #[test]
    fn topic_match_adds_one_to_relevance() {
        let cfg = RankConfig::default();
        let hit = item("wire", "startup news", 0);
        let miss = item("wire", "weather news", 0);
        let b_hit = score_breakdown(&hit, now(), &cfg, 0.0);
        let b_miss = score_breakdown(&miss, now(), &cfg, 0.0);
        assert!((b_hit.relevance - 1.0).abs() < 1e-6);
        assert!((b_miss.relevance).abs() < 1e-6);
        assert!(b_hit.total > b_miss.total);
    }

    #[test]
    fn future_timestamp_clamps_age_to_zero() {
        let cfg = RankConfig::default();
        let from_future = item("wire", "early story", -3);
        let b = score_breakdown(&from_future, now(), &cfg, 0.0);
        assert!((b.age_hours).abs() < 1e-6);
        assert!((b.recency_decay - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nonpositive_half_life_falls_back_to_24h() {
        let mut cfg = RankConfig::default();
        cfg.recency_half_life_hours = 0.0;
        let it = item("wire", "some story", 24);
        let b = score_breakdown(&it, now(), &cfg, 0.0);
        assert!((b.recency_decay - 0.5).abs() < 1e-4);
    }

    #[test]
    fn similarity_boost_is_additive_and_coefficient_scaled() {
        let mut cfg = RankConfig::default();
        cfg.similarity_coefficient = 0.2;
        let it = item("wire", "plain story", 0);
        let without = score_item(&it, now(), &cfg, 0.0);
        let with = score_item(&it, now(), &cfg, 1.0);
        assert!((with - without - 0.2).abs() < 1e-5);
    }

    #[test]
    fn equal_score_and_timestamp_break_by_ingestion_index() {
        let cfg = RankConfig::default();
        let a = item("wire", "story alpha", 2);
        let mut b = item("wire", "story bravo", 5);
        b.published_at = a.published_at; // identical timestamps, identical scores
        let empty = HashMap::new();

        let ranked = rank_items(&[a.clone(), b.clone()], now(), &cfg, &empty);
        assert_eq!(ranked[0].item.title, "story alpha");
        let ranked_swapped = rank_items(&[b, a], now(), &cfg, &empty);
        assert_eq!(ranked_swapped[0].item.title, "story bravo");
    }

    #[test]
    fn explain_matches_the_score() {
        let cfg = RankConfig::default();
        let it = item("techcrunch", "startup lands ten million", 3);
        let mut sims = HashMap::new();
        sims.insert(it.id.clone(), 0.5);

        let b = explain_item(&it, now(), &cfg, &sims);
        assert_eq!(b.matched_topics, vec!["startup".to_string()]);
        assert_eq!(b.matched_keywords.len(), 1); // "million"
        assert!((b.relevance - 1.5).abs() < 1e-6);
        assert!((b.source_weight - 1.2).abs() < 1e-6);
        assert!((b.total - score_item(&it, now(), &cfg, 0.5)).abs() < 1e-6);
    }

    #[test]
    fn rank_is_deterministic_across_runs() {
        let cfg = RankConfig::default();
        let items: Vec<Item> = (0..20)
            .map(|i| item("wire", &format!("story {i}"), i % 7))
            .collect();
        let empty = HashMap::new();
        let a: Vec<String> = rank_items(&items, now(), &cfg, &empty)
            .into_iter()
            .map(|r| r.item.id)
            .collect();
        let b: Vec<String> = rank_items(&items, now(), &cfg, &empty)
            .into_iter()
            .map(|r| r.item.id)
            .collect();
        assert_eq!(a, b);
    }
}
