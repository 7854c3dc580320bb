//! # Storage Contracts
//!
//! The ranking core does not own item or feedback persistence; it reads and
//! writes through the narrow trait contracts here. A real deployment plugs a
//! database behind them; `MemoryStore` backs the demo binary and the tests.
//!
//! Feedback keeps UPSERT semantics at the serving boundary (the latest event
//! per (reader, item) wins for display) while the log itself stays
//! append-only, because the aggregation windows need original event
//! timestamps, not the latest state.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use crate::cycle::WeightSnapshot;
use crate::feedback::FeedbackEvent;
use crate::item::{dedupe_key, Item};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Read contract over ingested items.
pub trait ItemStore {
    /// All items published on the given day, in ingestion order.
    fn items_by_date(&self, day: NaiveDate) -> Result<Vec<Item>, StoreError>;
    /// `(id, text)` pairs over everything published up to and including
    /// `as_of`, for corpus fitting.
    fn all_historical_items(&self, as_of: NaiveDate) -> Result<Vec<(String, String)>, StoreError>;
    /// `(id, text)` pairs of the reader's currently-approved items.
    fn positive_items(
        &self,
        reader: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<(String, String)>, StoreError>;
}

/// Read contract over the feedback event log.
pub trait FeedbackStore {
    /// Events for one reader, optionally filtered to a source, at or after
    /// `since`. Timestamps are the original event times.
    fn events(
        &self,
        reader: &str,
        source: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FeedbackEvent>, StoreError>;
}

/// Write contract for adaptation cycle snapshots, keyed by (reader, date).
pub trait SnapshotStore {
    /// Insert or deterministically overwrite the snapshot for its key.
    fn upsert(&self, snapshot: &WeightSnapshot) -> Result<(), StoreError>;
    fn get(&self, reader: &str, cycle_date: NaiveDate)
        -> Result<Option<WeightSnapshot>, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    items: Vec<Item>,
    item_keys: HashSet<String>,
    feedback: Vec<FeedbackEvent>,
    snapshots: BTreeMap<(String, NaiveDate), WeightSnapshot>,
}

/// In-process store implementing all three contracts.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

/// Item row as it appears in a JSON fixture; the dedupe key is derived.
#[derive(Debug, Deserialize)]
struct FixtureItem {
    source: String,
    url: String,
    published_at: DateTime<Utc>,
    title: String,
    #[serde(default)]
    evidence: String,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    items: Vec<FixtureItem>,
    #[serde(default)]
    feedback: Vec<FeedbackEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a JSON fixture file (`{"items": [...], "feedback": [...]}`).
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Unavailable(format!("reading {}: {e}", path.display())))?;
        let fixture: Fixture = serde_json::from_str(&content)
            .map_err(|e| StoreError::Unavailable(format!("parsing {}: {e}", path.display())))?;

        let store = Self::new();
        let items: Vec<Item> = fixture
            .items
            .into_iter()
            .map(|f| Item::new(f.source, f.url, f.published_at, f.title, f.evidence))
            .collect();
        store.insert_items(items);
        for ev in fixture.feedback {
            store.record_feedback(ev);
        }
        Ok(store)
    }

    /// Insert items, ignoring duplicates by dedupe key. Returns (inserted,
    /// duplicates).
    pub fn insert_items(&self, items: Vec<Item>) -> (usize, usize) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let mut inserted = 0usize;
        let mut duplicates = 0usize;
        for item in items {
            if inner.item_keys.insert(item.dedupe_key.clone()) {
                inner.items.push(item);
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }
        (inserted, duplicates)
    }

    /// Append a feedback event. A newer event for the same (reader, item)
    /// supersedes the older one in the current-state view; the log keeps both.
    pub fn record_feedback(&self, event: FeedbackEvent) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.feedback.push(event);
    }

    /// Latest vote a reader has on an item, if any.
    pub fn current_feedback(&self, reader: &str, item: &str) -> Option<bool> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .feedback
            .iter()
            .filter(|ev| ev.reader == reader && ev.item == item)
            .max_by_key(|ev| ev.at)
            .map(|ev| ev.useful)
    }

    /// Distinct readers present in the feedback log, sorted.
    pub fn readers(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut out: Vec<String> = inner
            .feedback
            .iter()
            .map(|ev| ev.reader.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        out.sort();
        out
    }

    /// Latest vote per (reader, item) across the log, up to end of `as_of`.
    fn current_votes(inner: &Inner, reader: &str, as_of: NaiveDate) -> HashMap<String, bool> {
        let cutoff = end_of_day(as_of);
        let mut latest: HashMap<String, (DateTime<Utc>, bool)> = HashMap::new();
        for ev in &inner.feedback {
            if ev.reader != reader || ev.at > cutoff {
                continue;
            }
            match latest.get(&ev.item) {
                Some((at, _)) if *at >= ev.at => {}
                _ => {
                    latest.insert(ev.item.clone(), (ev.at, ev.useful));
                }
            }
        }
        latest.into_iter().map(|(k, (_, v))| (k, v)).collect()
    }
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(23, 59, 59)
        .expect("valid end-of-day time")
        .and_utc()
}

impl ItemStore for MemoryStore {
    fn items_by_date(&self, day: NaiveDate) -> Result<Vec<Item>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .items
            .iter()
            .filter(|it| it.published_at.date_naive() == day)
            .cloned()
            .collect())
    }

    fn all_historical_items(&self, as_of: NaiveDate) -> Result<Vec<(String, String)>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .items
            .iter()
            .filter(|it| it.published_at.date_naive() <= as_of)
            .map(|it| (it.id.clone(), it.search_text()))
            .collect())
    }

    fn positive_items(
        &self,
        reader: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let votes = Self::current_votes(&inner, reader, as_of);
        Ok(inner
            .items
            .iter()
            .filter(|it| votes.get(&it.dedupe_key).copied() == Some(true))
            .map(|it| (it.id.clone(), it.search_text()))
            .collect())
    }
}

impl FeedbackStore for MemoryStore {
    fn events(
        &self,
        reader: &str,
        source: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FeedbackEvent>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .feedback
            .iter()
            .filter(|ev| ev.reader == reader)
            .filter(|ev| source.is_none_or(|s| ev.source.eq_ignore_ascii_case(s)))
            .filter(|ev| since.is_none_or(|t| ev.at >= t))
            .cloned()
            .collect())
    }
}

impl SnapshotStore for MemoryStore {
    fn upsert(&self, snapshot: &WeightSnapshot) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.snapshots.insert(
            (snapshot.reader.clone(), snapshot.cycle_date),
            snapshot.clone(),
        );
        Ok(())
    }

    fn get(
        &self,
        reader: &str,
        cycle_date: NaiveDate,
    ) -> Result<Option<WeightSnapshot>, StoreError> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .snapshots
            .get(&(reader.to_string(), cycle_date))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    fn item(source: &str, title: &str, day: u32) -> Item {
        Item::new(
            source,
            format!("https://example.com/{}", title.replace(' ', "-")),
            ts(day, 9),
            title,
            "short evidence",
        )
    }

    #[test]
    fn duplicate_inserts_are_ignored() {
        let store = MemoryStore::new();
        let (ins, dup) = store.insert_items(vec![
            item("wire", "story one", 10),
            item("wire", "story one", 10),
            item("wire", "story two", 10),
        ]);
        assert_eq!((ins, dup), (2, 1));
    }

    #[test]
    fn feedback_upsert_keeps_history_but_serves_latest() {
        let store = MemoryStore::new();
        let it = item("wire", "story one", 10);
        let key = it.dedupe_key.clone();
        store.insert_items(vec![it]);

        store.record_feedback(FeedbackEvent {
            reader: "r1".into(),
            item: key.clone(),
            source: "wire".into(),
            useful: true,
            at: ts(10, 10),
        });
        store.record_feedback(FeedbackEvent {
            reader: "r1".into(),
            item: key.clone(),
            source: "wire".into(),
            useful: false,
            at: ts(10, 12),
        });

        // Serving view: latest wins.
        assert_eq!(store.current_feedback("r1", &key), Some(false));
        // Aggregation view: both events survive with their timestamps.
        let log = store.events("r1", None, None).unwrap();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn positive_items_follow_the_latest_vote() {
        let store = MemoryStore::new();
        let liked = item("wire", "liked story", 10);
        let flipped = item("wire", "flipped story", 10);
        let keys = (liked.dedupe_key.clone(), flipped.dedupe_key.clone());
        store.insert_items(vec![liked, flipped]);

        for (key, votes) in [
            (&keys.0, vec![(ts(10, 10), true)]),
            (&keys.1, vec![(ts(10, 10), true), (ts(11, 9), false)]),
        ] {
            for (at, useful) in votes {
                store.record_feedback(FeedbackEvent {
                    reader: "r1".into(),
                    item: key.clone(),
                    source: "wire".into(),
                    useful,
                    at,
                });
            }
        }

        let positives = store
            .positive_items("r1", NaiveDate::from_ymd_opt(2026, 1, 12).unwrap())
            .unwrap();
        assert_eq!(positives.len(), 1);
        assert!(positives[0].1.contains("liked story"));

        // Replaying before the flip sees both as positive.
        let earlier = store
            .positive_items("r1", NaiveDate::from_ymd_opt(2026, 1, 10).unwrap())
            .unwrap();
        assert_eq!(earlier.len(), 2);
    }

    #[test]
    fn events_filter_by_source_and_since() {
        let store = MemoryStore::new();
        for (source, at) in [("wire", ts(10, 9)), ("blog", ts(11, 9)), ("wire", ts(12, 9))] {
            store.record_feedback(FeedbackEvent {
                reader: "r1".into(),
                item: format!("k-{source}-{at}"),
                source: source.into(),
                useful: true,
                at,
            });
        }
        let wire = store.events("r1", Some("Wire"), None).unwrap();
        assert_eq!(wire.len(), 2);
        let recent = store.events("r1", None, Some(ts(11, 0))).unwrap();
        assert_eq!(recent.len(), 2);
    }
}
