//! # Adaptation Cycle Controller
//!
//! Orchestrates one reader-scoped, date-scoped adaptation attempt:
//!
//! ```text
//! Start -> Aggregated -> Proposed -> Evaluated -> { Applied
//!                                                | RejectedRegression
//!                                                | RejectedNoFeedback }
//! ```
//!
//! The evaluation gate is non-negotiable: the quality suite runs once with
//! the current weights and once with the proposed weights, and the proposal
//! is applied only when the candidate pass rate is at least the baseline.
//! Rejections are successful terminal outcomes, not errors. Every terminal
//! state persists an immutable snapshot keyed by (reader, cycle date);
//! re-running the same key overwrites deterministically.
//!
//! Storage failures abort loudly before the live config is touched; a
//! half-completed cycle is worse than a delayed one.

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::RankerError;
use crate::evals::QualityEvals;
use crate::feedback::{aggregate_by_source, SourceStats};
use crate::live::ConfigRegistry;
use crate::telemetry::ensure_metrics_described;
use crate::store::{FeedbackStore, SnapshotStore};
use crate::weights::{propose_weights, weight_changes, WeightChange};

pub const REASON_NO_FEEDBACK: &str = "no_feedback";
pub const REASON_REGRESSION: &str = "regression";

/// Terminal state of one adaptation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Applied,
    RejectedRegression,
    RejectedNoFeedback,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Applied => "applied",
            CycleOutcome::RejectedRegression => "rejected_regression",
            CycleOutcome::RejectedNoFeedback => "rejected_no_feedback",
        }
    }
}

/// The unit of truth for one cycle. Written exactly once per run; a re-run
/// with the same (reader, cycle_date) key replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightSnapshot {
    pub reader: String,
    pub cycle_date: NaiveDate,
    pub weights_before: BTreeMap<String, f32>,
    pub weights_after: BTreeMap<String, f32>,
    pub feedback_summary: BTreeMap<String, SourceStats>,
    pub eval_pass_rate_before: f32,
    pub eval_pass_rate_after: f32,
    pub applied: bool,
    pub rejected_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything a caller needs to report on a finished cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub snapshot: WeightSnapshot,
    pub changes: Vec<WeightChange>,
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(23, 59, 59)
        .expect("valid end-of-day time")
        .and_utc()
}

/// Run one adaptation cycle for `reader` as of `cycle_date`.
///
/// The evaluation suite and all storage come in as trait objects, so the
/// controller is testable with stub suites returning controlled pass rates.
pub fn run_cycle(
    reader: &str,
    cycle_date: NaiveDate,
    feedback: &dyn FeedbackStore,
    snapshots: &dyn SnapshotStore,
    evals: &dyn QualityEvals,
    live: &ConfigRegistry,
) -> Result<CycleReport, RankerError> {
    ensure_metrics_described();
    tracing::info!(reader, %cycle_date, "adaptation cycle started");

    let cfg_before = live.config_for(reader);
    let weights_before = cfg_before.source_weights.clone();

    // Start -> Aggregated. Windows run off event timestamps relative to the
    // cycle date, so historical dates replay identically.
    let events = feedback.events(reader, None, None)?;
    let stats = aggregate_by_source(&events, end_of_day(cycle_date));
    tracing::info!(
        reader,
        sources = stats.len(),
        events = events.len(),
        "aggregated feedback"
    );

    if stats.is_empty() {
        // Nothing met the vote minimum: terminal, accepted, not an error.
        let snapshot = WeightSnapshot {
            reader: reader.to_string(),
            cycle_date,
            weights_before: weights_before.clone(),
            weights_after: weights_before.clone(),
            feedback_summary: stats,
            eval_pass_rate_before: 1.0,
            eval_pass_rate_after: 1.0,
            applied: false,
            rejected_reason: Some(REASON_NO_FEEDBACK.to_string()),
            created_at: Utc::now(),
        };
        snapshots.upsert(&snapshot)?;
        counter!("adapt_cycles_total", "outcome" => CycleOutcome::RejectedNoFeedback.as_str())
            .increment(1);
        tracing::info!(reader, "no feedback above vote minimum; weights unchanged");
        return Ok(CycleReport {
            outcome: CycleOutcome::RejectedNoFeedback,
            changes: weight_changes(&weights_before, &weights_before, &snapshot.feedback_summary),
            snapshot,
        });
    }

    // Aggregated -> Proposed.
    let proposed = propose_weights(&weights_before, &stats);

    // Proposed -> Evaluated. Two full suite runs: baseline and candidate.
    let mut cfg_after = (*cfg_before).clone();
    cfg_after.source_weights = proposed.clone();
    let eval_before = evals.run(&cfg_before);
    let eval_after = evals.run(&cfg_after);
    tracing::info!(
        reader,
        pass_rate_before = eval_before.pass_rate(),
        pass_rate_after = eval_after.pass_rate(),
        "evaluated candidate weights"
    );

    let regressed = eval_after.pass_rate() < eval_before.pass_rate();
    let (outcome, weights_after, rejected_reason) = if regressed {
        (
            CycleOutcome::RejectedRegression,
            weights_before.clone(),
            Some(REASON_REGRESSION.to_string()),
        )
    } else {
        (CycleOutcome::Applied, proposed, None)
    };

    let snapshot = WeightSnapshot {
        reader: reader.to_string(),
        cycle_date,
        weights_before: weights_before.clone(),
        weights_after: weights_after.clone(),
        feedback_summary: stats,
        eval_pass_rate_before: eval_before.pass_rate(),
        eval_pass_rate_after: eval_after.pass_rate(),
        applied: outcome == CycleOutcome::Applied,
        rejected_reason,
        created_at: Utc::now(),
    };

    // Persist first; only a durably recorded cycle may touch the live config.
    snapshots.upsert(&snapshot)?;
    if snapshot.applied {
        live.swap(reader, cfg_after);
    }

    counter!("adapt_cycles_total", "outcome" => outcome.as_str()).increment(1);
    tracing::info!(reader, outcome = outcome.as_str(), "adaptation cycle finished");

    Ok(CycleReport {
        outcome,
        changes: weight_changes(&weights_before, &weights_after, &snapshot.feedback_summary),
        snapshot,
    })
}
