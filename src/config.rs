//! # Rank Configuration
//!
//! The live configuration consumed by the scorer: topical boosts, per-source
//! trust multipliers, recency half-life and the similarity-boost coefficient.
//!
//! - Loads from TOML or JSON (`RANK_CONFIG_PATH` → `config/rank.toml` →
//!   `config/rank.json` → built-in defaults).
//! - Bounds are validated loudly on load: source weights in [0.5, 2.0],
//!   similarity coefficient in [0.0, 0.2]. A persisted config outside those
//!   bounds means a writer bug upstream, so loading fails instead of clamping.
//! - A source missing from the table always resolves to multiplier 1.0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RankerError;

pub const ENV_RANK_CONFIG_PATH: &str = "RANK_CONFIG_PATH";
const DEFAULT_TOML_PATH: &str = "config/rank.toml";
const DEFAULT_JSON_PATH: &str = "config/rank.json";

pub const MIN_SOURCE_WEIGHT: f32 = 0.5;
pub const MAX_SOURCE_WEIGHT: f32 = 2.0;
pub const MAX_SIMILARITY_COEFFICIENT: f32 = 0.2;
pub const DEFAULT_HALF_LIFE_HOURS: f32 = 24.0;

/// Which item fields participate in topic/keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Evidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankConfig {
    /// Topic phrases; each match adds +1.0 to relevance.
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    /// High-signal keywords with their individual boosts.
    #[serde(default = "default_keyword_boosts")]
    pub keyword_boosts: BTreeMap<String, f32>,
    /// Per-source trust multipliers, bounded [0.5, 2.0]. Unknown sources get 1.0.
    #[serde(default = "default_source_weights")]
    pub source_weights: BTreeMap<String, f32>,
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<SearchField>,
    /// Recency half-life; values <= 0 are treated as 24.0 at the use site.
    #[serde(default = "default_half_life")]
    pub recency_half_life_hours: f32,
    /// Additive similarity-boost coefficient, bounded [0.0, 0.2].
    #[serde(default = "default_similarity_coefficient")]
    pub similarity_coefficient: f32,
}

fn default_topics() -> Vec<String> {
    [
        "AI",
        "artificial intelligence",
        "machine learning",
        "startup",
        "funding",
        "raised",
        "cloud",
        "AWS",
        "Azure",
        "Google Cloud",
        "security",
        "cybersecurity",
        "breach",
        "open source",
        "GitHub",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_keyword_boosts() -> BTreeMap<String, f32> {
    [
        ("million", 0.5),
        ("billion", 0.5),
        ("acquisition", 0.5),
        ("acquired", 0.5),
        ("breakthrough", 0.5),
        ("launches", 0.3),
        ("announces", 0.3),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_source_weights() -> BTreeMap<String, f32> {
    [
        ("techcrunch", 1.2),
        ("hackernews", 1.1),
        ("arstechnica", 1.1),
        ("theverge", 1.0),
        ("wired", 1.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_search_fields() -> Vec<SearchField> {
    vec![SearchField::Title, SearchField::Evidence]
}

fn default_half_life() -> f32 {
    DEFAULT_HALF_LIFE_HOURS
}

fn default_similarity_coefficient() -> f32 {
    0.1
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            keyword_boosts: default_keyword_boosts(),
            source_weights: default_source_weights(),
            search_fields: default_search_fields(),
            recency_half_life_hours: default_half_life(),
            similarity_coefficient: default_similarity_coefficient(),
        }
    }
}

impl RankConfig {
    /// Trust multiplier for a source, case-insensitive. Fresh sources get 1.0.
    pub fn source_weight(&self, source: &str) -> f32 {
        self.source_weights
            .get(&source.to_ascii_lowercase())
            .copied()
            .unwrap_or(1.0)
    }

    /// Bounds validation. Called on every load; see module docs for why
    /// violations fail instead of clamping.
    pub fn validate(&self) -> Result<(), RankerError> {
        for (source, &w) in &self.source_weights {
            if !w.is_finite() || !(MIN_SOURCE_WEIGHT..=MAX_SOURCE_WEIGHT).contains(&w) {
                return Err(RankerError::MalformedConfig {
                    reason: format!(
                        "source weight for `{source}` is {w}, outside [{MIN_SOURCE_WEIGHT}, {MAX_SOURCE_WEIGHT}]"
                    ),
                });
            }
        }
        if !self.similarity_coefficient.is_finite()
            || !(0.0..=MAX_SIMILARITY_COEFFICIENT).contains(&self.similarity_coefficient)
        {
            return Err(RankerError::MalformedConfig {
                reason: format!(
                    "similarity coefficient is {}, outside [0.0, {MAX_SIMILARITY_COEFFICIENT}]",
                    self.similarity_coefficient
                ),
            });
        }
        if !self.recency_half_life_hours.is_finite() {
            return Err(RankerError::MalformedConfig {
                reason: "recency half-life is not finite".to_string(),
            });
        }
        for (kw, &boost) in &self.keyword_boosts {
            if !boost.is_finite() || boost < 0.0 {
                return Err(RankerError::MalformedConfig {
                    reason: format!("keyword boost for `{kw}` is {boost}"),
                });
            }
        }
        Ok(())
    }

    /// Load and validate from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self, RankerError> {
        let content = fs::read_to_string(path).map_err(|e| RankerError::MalformedConfig {
            reason: format!("reading {}: {e}", path.display()),
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let cfg: RankConfig = if ext == "json" {
            serde_json::from_str(&content).map_err(|e| RankerError::MalformedConfig {
                reason: format!("parsing {}: {e}", path.display()),
            })?
        } else {
            toml::from_str(&content).map_err(|e| RankerError::MalformedConfig {
                reason: format!("parsing {}: {e}", path.display()),
            })?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using the env var + fallback chain:
    /// 1) $RANK_CONFIG_PATH
    /// 2) config/rank.toml
    /// 3) config/rank.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self, RankerError> {
        if let Ok(p) = std::env::var(ENV_RANK_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(RankerError::MalformedConfig {
                    reason: format!("{ENV_RANK_CONFIG_PATH} points to non-existent path"),
                });
            }
            return Self::load_from(&pb);
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }
}
