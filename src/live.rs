//! # Live Config Registry
//!
//! The serving path reads per-reader `RankConfig` values while adaptation
//! cycles replace them. Configs are immutable once published: a swap installs
//! a whole new `Arc<RankConfig>`, never a field-by-field mutation, so a
//! reader can never observe a half-written config.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::config::RankConfig;
use crate::item::Item;
use crate::scoring::{rank_items, RankedItem};
use crate::similarity::TfidfModel;

/// Copy-on-write registry of live configs, one per reader, with a shared
/// default for readers that have never been adapted.
pub struct ConfigRegistry {
    default: Arc<RankConfig>,
    per_reader: RwLock<HashMap<String, Arc<RankConfig>>>,
}

impl ConfigRegistry {
    pub fn new(default_cfg: RankConfig) -> Self {
        Self {
            default: Arc::new(default_cfg),
            per_reader: RwLock::new(HashMap::new()),
        }
    }

    /// The live config for a reader. Always complete and self-consistent;
    /// falls back to the default config for unknown readers.
    pub fn config_for(&self, reader: &str) -> Arc<RankConfig> {
        let map = self.per_reader.read().expect("registry lock poisoned");
        map.get(reader).cloned().unwrap_or_else(|| self.default.clone())
    }

    /// Atomically replace a reader's live config (Applied transitions only).
    pub fn swap(&self, reader: &str, cfg: RankConfig) {
        let mut map = self.per_reader.write().expect("registry lock poisoned");
        map.insert(reader.to_string(), Arc::new(cfg));
    }
}

/// Serving-path entry point: similarity boost + scoring under the reader's
/// live config. `model = None` is the cold-start state (no boost).
pub fn score_and_rank(
    items: &[Item],
    registry: &ConfigRegistry,
    reader: &str,
    model: Option<&TfidfModel>,
    positives: &[(String, String)],
    now: DateTime<Utc>,
) -> Vec<RankedItem> {
    let cfg = registry.config_for(reader);

    let candidates: Vec<(String, String)> = items
        .iter()
        .map(|it| (it.id.clone(), it.search_text()))
        .collect();
    let similarity = model
        .map(|m| m.score(positives, &candidates))
        .unwrap_or_default();

    rank_items(items, now, &cfg, &similarity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_reader_sees_default_config() {
        let registry = ConfigRegistry::new(RankConfig::default());
        let cfg = registry.config_for("nobody");
        assert!((cfg.source_weight("techcrunch") - 1.2).abs() < 1e-6);
    }

    #[test]
    fn swap_replaces_whole_config_per_reader() {
        let registry = ConfigRegistry::new(RankConfig::default());
        let before = registry.config_for("r1");

        let mut cfg = RankConfig::default();
        cfg.source_weights.insert("techcrunch".into(), 1.3);
        registry.swap("r1", cfg);

        let after = registry.config_for("r1");
        assert!((after.source_weight("techcrunch") - 1.3).abs() < 1e-6);
        // The previously handed-out Arc still sees the old, complete config.
        assert!((before.source_weight("techcrunch") - 1.2).abs() < 1e-6);
        // Other readers are untouched.
        assert!((registry.config_for("r2").source_weight("techcrunch") - 1.2).abs() < 1e-6);
    }

    #[test]
    fn cold_start_rank_runs_without_model() {
        let registry = ConfigRegistry::new(RankConfig::default());
        let now = Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap();
        let items = vec![Item::new(
            "wire",
            "https://example.com/a",
            now,
            "A quiet day",
            "",
        )];
        let ranked = score_and_rank(&items, &registry, "r1", None, &[], now);
        assert_eq!(ranked.len(), 1);
    }
}
