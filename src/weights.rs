//! # Weight Adapter
//!
//! Converts per-source effectiveness rates into small, bounded trust
//! multiplier deltas. Pure functions, no persistence.
//!
//! Policy per source present in the stats map:
//! - effective rate > 0.7  → weight += 0.1, clamped to 2.0
//! - effective rate < 0.3  → weight -= 0.1, clamped to 0.5
//! - rate in [0.3, 0.7]    → unchanged (neutral zone, avoids thrashing on
//!   noisy small samples)
//!
//! Sources absent from the stats map pass through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{MAX_SOURCE_WEIGHT, MIN_SOURCE_WEIGHT};
use crate::feedback::SourceStats;

pub const ADJUSTMENT_STEP: f32 = 0.1;
pub const HIGH_THRESHOLD: f32 = 0.7;
pub const LOW_THRESHOLD: f32 = 0.3;

/// One row of the weight-change report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightChange {
    pub source: String,
    pub before: f32,
    pub after: f32,
    pub change: f32,
    pub reason: String,
}

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

/// Propose new weights from current weights and aggregated rates.
///
/// A source with feedback but no explicit current weight starts from the
/// neutral 1.0 multiplier.
pub fn propose_weights(
    current: &BTreeMap<String, f32>,
    stats: &BTreeMap<String, SourceStats>,
) -> BTreeMap<String, f32> {
    let mut proposed = current.clone();

    for (source, s) in stats {
        let source_key = source.to_ascii_lowercase();
        let before = proposed.get(&source_key).copied().unwrap_or(1.0);

        let after = if s.effective_rate > HIGH_THRESHOLD {
            (before + ADJUSTMENT_STEP).min(MAX_SOURCE_WEIGHT)
        } else if s.effective_rate < LOW_THRESHOLD {
            (before - ADJUSTMENT_STEP).max(MIN_SOURCE_WEIGHT)
        } else {
            before
        };

        proposed.insert(source_key, round2(after));
    }

    proposed
}

/// Detailed per-source change rows for the cycle report artifact.
pub fn weight_changes(
    before: &BTreeMap<String, f32>,
    after: &BTreeMap<String, f32>,
    stats: &BTreeMap<String, SourceStats>,
) -> Vec<WeightChange> {
    let mut sources: Vec<&String> = before.keys().chain(after.keys()).collect();
    sources.sort();
    sources.dedup();

    sources
        .into_iter()
        .map(|source| {
            let b = before.get(source).copied().unwrap_or(1.0);
            let a = after.get(source).copied().unwrap_or(1.0);
            let delta = a - b;

            let reason = match stats.get(source) {
                None => "no feedback data".to_string(),
                Some(s) if delta > 0.0 => {
                    format!("effective_rate {:.2} > {HIGH_THRESHOLD}", s.effective_rate)
                }
                Some(s) if delta < 0.0 => {
                    format!("effective_rate {:.2} < {LOW_THRESHOLD}", s.effective_rate)
                }
                Some(s) => format!("neutral zone ({:.2})", s.effective_rate),
            };

            WeightChange {
                source: source.clone(),
                before: b,
                after: a,
                change: delta,
                reason,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::effective_rate;

    fn stats_with_rate(source: &str, rate: f32) -> BTreeMap<String, SourceStats> {
        let mut m = BTreeMap::new();
        m.insert(
            source.to_string(),
            SourceStats {
                source: source.to_string(),
                total: 10,
                useful: (rate * 10.0) as u32,
                rate_7d: rate,
                rate_longterm: rate,
                effective_rate: effective_rate(rate, rate),
            },
        );
        m
    }

    fn weights(pairs: &[(&str, f32)]) -> BTreeMap<String, f32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn high_rate_bumps_weight() {
        let out = propose_weights(&weights(&[("wire", 1.0)]), &stats_with_rate("wire", 0.9));
        assert!((out["wire"] - 1.1).abs() < 1e-6);
    }

    #[test]
    fn low_rate_cuts_weight() {
        let out = propose_weights(&weights(&[("wire", 1.0)]), &stats_with_rate("wire", 0.1));
        assert!((out["wire"] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn neutral_zone_leaves_weight_alone() {
        for rate in [0.3, 0.5, 0.7] {
            let out = propose_weights(&weights(&[("wire", 1.3)]), &stats_with_rate("wire", rate));
            assert!((out["wire"] - 1.3).abs() < 1e-6, "rate {rate} changed weight");
        }
    }

    #[test]
    fn bounds_hold_under_extreme_rates() {
        let up = propose_weights(&weights(&[("wire", 1.95)]), &stats_with_rate("wire", 1.0));
        assert!((up["wire"] - 2.0).abs() < 1e-6);

        let down = propose_weights(&weights(&[("wire", 0.55)]), &stats_with_rate("wire", 0.0));
        assert!((down["wire"] - 0.5).abs() < 1e-6);

        // Repeated cycles stay pinned at the bound.
        let again = propose_weights(&up, &stats_with_rate("wire", 1.0));
        assert!((again["wire"] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_source_with_feedback_starts_from_neutral() {
        let out = propose_weights(&BTreeMap::new(), &stats_with_rate("fresh", 0.95));
        assert!((out["fresh"] - 1.1).abs() < 1e-6);
    }

    #[test]
    fn sources_without_stats_pass_through() {
        let current = weights(&[("quiet", 1.7)]);
        let out = propose_weights(&current, &stats_with_rate("loud", 0.9));
        assert!((out["quiet"] - 1.7).abs() < 1e-6);
    }

    #[test]
    fn change_rows_cover_both_maps_with_reasons() {
        let before = weights(&[("up", 1.0), ("same", 1.2)]);
        let stats = stats_with_rate("up", 0.9);
        let after = propose_weights(&before, &stats);

        let rows = weight_changes(&before, &after, &stats);
        assert_eq!(rows.len(), 2);
        let up = rows.iter().find(|r| r.source == "up").unwrap();
        assert!(up.change > 0.0);
        assert!(up.reason.contains("> 0.7"));
        let same = rows.iter().find(|r| r.source == "same").unwrap();
        assert_eq!(same.reason, "no feedback data");
    }
}
