//! # News Items
//!
//! Deduplicated content records plus the normalization helpers that produce
//! their stable `dedupe_key`.
//!
//! - URL canonicalization: lowercase scheme/host, strip fragment and tracking
//!   params, sort the remaining query.
//! - Title normalization: trim + collapse internal whitespace.
//! - `dedupe_key` = SHA-256 over `normalized_url|normalized_title`.
//!
//! Items are immutable after creation; the ranking core only reads them.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A deduplicated news record. Created at ingestion, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier (the dedupe key doubles as the id in fixtures).
    pub id: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub title: String,
    /// Short evidence text (lede/excerpt) used by relevance matching.
    #[serde(default)]
    pub evidence: String,
    pub dedupe_key: String,
}

impl Item {
    /// Build an item, computing `id`/`dedupe_key` from url + title.
    pub fn new(
        source: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
        title: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let title = title.into();
        let key = dedupe_key(&url, &title);
        Self {
            id: key.clone(),
            source: source.into(),
            url,
            published_at,
            title,
            evidence: evidence.into(),
            dedupe_key: key,
        }
    }

    /// Concatenated text used for TF-IDF vectorization: `title evidence`.
    pub fn search_text(&self) -> String {
        let mut out = self.title.clone();
        if !self.evidence.is_empty() {
            out.push(' ');
            out.push_str(&self.evidence);
        }
        out
    }
}

/// Query params stripped during URL canonicalization.
static TRACKING_PARAMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "utm_source",
        "utm_medium",
        "utm_campaign",
        "utm_term",
        "utm_content",
        "fbclid",
        "gclid",
        "mc_cid",
        "mc_eid",
    ]
    .into_iter()
    .collect()
});

/// Canonicalize a URL for deduplication.
///
/// Lowercases scheme + host, drops the fragment, removes tracking params and
/// sorts whatever query remains. Not a full RFC parser; good enough for the
/// feed URLs this system sees, and a malformed URL passes through verbatim
/// (a stable key matters more than a pretty one).
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();

    // Split off the fragment first.
    let without_fragment = url.split('#').next().unwrap_or(url);

    let (head, query) = match without_fragment.split_once('?') {
        Some((h, q)) => (h, Some(q)),
        None => (without_fragment, None),
    };

    // Lowercase scheme://host, keep the path as-is.
    let head = match head.find("://") {
        Some(pos) => {
            let scheme = head[..pos].to_ascii_lowercase();
            let rest = &head[pos + 3..];
            let (host, path) = match rest.find('/') {
                Some(p) => (&rest[..p], &rest[p..]),
                None => (rest, ""),
            };
            format!("{}://{}{}", scheme, host.to_ascii_lowercase(), path)
        }
        None => head.to_string(),
    };

    let query = match query {
        Some(q) if !q.is_empty() => {
            let mut pairs: Vec<(&str, &str)> = q
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|p| p.split_once('=').unwrap_or((p, "")))
                .filter(|(k, _)| !TRACKING_PARAMS.contains(k.to_ascii_lowercase().as_str()))
                .collect();
            pairs.sort();
            pairs
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        (*k).to_string()
                    } else {
                        format!("{k}={v}")
                    }
                })
                .collect::<Vec<_>>()
                .join("&")
        }
        _ => String::new(),
    };

    if query.is_empty() {
        head
    } else {
        format!("{head}?{query}")
    }
}

/// Normalize a title for deduplication: trim + collapse whitespace runs.
pub fn normalize_title(title: &str) -> String {
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
    RE_WS.replace_all(title.trim(), " ").to_string()
}

/// Stable content key used for idempotency and the storage unique constraint.
pub fn dedupe_key(url: &str, title: &str) -> String {
    use sha2::{Digest, Sha256};
    let raw = format!("{}|{}", normalize_url(url), normalize_title(title));
    let digest = Sha256::digest(raw.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Drop later duplicates from a batch, keyed by `dedupe_key`. First wins.
pub fn dedupe_items(items: Vec<Item>) -> Vec<Item> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.dedupe_key.clone()) {
            out.push(item);
        }
    }
    out
}
