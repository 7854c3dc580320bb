//! # Feedback Aggregator
//!
//! Reduces the raw per-item approval log into per-source effectiveness rates
//! over two windows: the last 7 days and all time. Windows are computed from
//! event timestamps relative to an explicit `as_of` instant, never the wall
//! clock, so any historical cycle date replays to the same result.
//!
//! Blend: `effective_rate = 0.7 * rate_7d + 0.3 * rate_longterm`. Recent
//! feedback dominates while long-term history damps short-term noise.
//!
//! Sources with fewer than [`MIN_VOTES`] total votes are omitted from the
//! result map entirely; the weight adapter must never see them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SHORT_WINDOW_DAYS: i64 = 7;
pub const MIN_VOTES: u32 = 5;

/// One approval/disapproval event. Append-only; the aggregator consumes the
/// full log with original timestamps, not the latest-state view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub reader: String,
    /// Item dedupe key the vote refers to.
    pub item: String,
    pub source: String,
    pub useful: bool,
    pub at: DateTime<Utc>,
}

/// Aggregated feedback for a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStats {
    pub source: String,
    pub total: u32,
    pub useful: u32,
    pub rate_7d: f32,
    pub rate_longterm: f32,
    /// 0.7 * rate_7d + 0.3 * rate_longterm
    pub effective_rate: f32,
}

/// Blend short-term and long-term approval rates.
pub fn effective_rate(rate_7d: f32, rate_longterm: f32) -> f32 {
    0.7 * rate_7d + 0.3 * rate_longterm
}

#[derive(Default)]
struct Tally {
    total: u32,
    useful: u32,
    total_7d: u32,
    useful_7d: u32,
}

/// Aggregate a reader's event log into per-source stats as of `as_of`.
///
/// Events after `as_of` are ignored (they belong to a later cycle). Sources
/// below the vote minimum are absent from the map. BTreeMap keeps iteration
/// order stable for snapshots and reports.
pub fn aggregate_by_source(
    events: &[FeedbackEvent],
    as_of: DateTime<Utc>,
) -> BTreeMap<String, SourceStats> {
    let window_start = as_of - Duration::days(SHORT_WINDOW_DAYS);

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for ev in events {
        if ev.at > as_of {
            continue;
        }
        let tally = tallies.entry(ev.source.to_ascii_lowercase()).or_default();
        tally.total += 1;
        if ev.useful {
            tally.useful += 1;
        }
        if ev.at > window_start {
            tally.total_7d += 1;
            if ev.useful {
                tally.useful_7d += 1;
            }
        }
    }

    tallies
        .into_iter()
        .filter(|(_, t)| t.total >= MIN_VOTES)
        .map(|(source, t)| {
            let rate_7d = if t.total_7d > 0 {
                t.useful_7d as f32 / t.total_7d as f32
            } else {
                0.0
            };
            let rate_longterm = t.useful as f32 / t.total as f32;
            let stats = SourceStats {
                source: source.clone(),
                total: t.total,
                useful: t.useful,
                rate_7d,
                rate_longterm,
                effective_rate: effective_rate(rate_7d, rate_longterm),
            };
            (source, stats)
        })
        .collect()
}
