//! # Cycle Report
//! Markdown artifact summarizing one adaptation cycle: feedback table,
//! weight changes, eval comparison, result. Pure rendering; the binary
//! decides where the file lands.

use crate::cycle::{CycleReport, WeightSnapshot};

/// Render the weight-update report for a finished cycle.
pub fn render_cycle_report(report: &CycleReport) -> String {
    let snap: &WeightSnapshot = &report.snapshot;
    let mut lines: Vec<String> = vec![
        format!(
            "# Weight Update Report - {} (reader {})",
            snap.cycle_date, snap.reader
        ),
        String::new(),
        "## Feedback Summary".to_string(),
        "| Source | Total | Useful | Rate 7d | Rate LT | Effective |".to_string(),
        "|--------|-------|--------|---------|---------|-----------|".to_string(),
    ];

    for (source, stats) in &snap.feedback_summary {
        lines.push(format!(
            "| {} | {} | {} | {:.2} | {:.2} | {:.2} |",
            source, stats.total, stats.useful, stats.rate_7d, stats.rate_longterm,
            stats.effective_rate
        ));
    }
    if snap.feedback_summary.is_empty() {
        lines.push("| (no feedback data) | - | - | - | - | - |".to_string());
    }

    lines.extend([
        String::new(),
        "## Weight Changes".to_string(),
        "| Source | Before | After | Change | Reason |".to_string(),
        "|--------|--------|-------|--------|--------|".to_string(),
    ]);

    for change in &report.changes {
        let delta = if change.change > 0.0 {
            format!("+{:.2}", change.change)
        } else if change.change < 0.0 {
            format!("{:.2}", change.change)
        } else {
            "-".to_string()
        };
        lines.push(format!(
            "| {} | {:.2} | {:.2} | {} | {} |",
            change.source, change.before, change.after, delta, change.reason
        ));
    }
    if report.changes.is_empty() {
        lines.push("| (no changes) | - | - | - | - |".to_string());
    }

    lines.extend([
        String::new(),
        "## Eval Comparison (Fixtures - Gating)".to_string(),
        format!("- Baseline: {:.0}%", snap.eval_pass_rate_before * 100.0),
        format!("- Candidate: {:.0}%", snap.eval_pass_rate_after * 100.0),
        format!(
            "- Delta: {:+.1}%",
            (snap.eval_pass_rate_after - snap.eval_pass_rate_before) * 100.0
        ),
        String::new(),
        "## Result".to_string(),
    ]);

    if snap.applied {
        lines.push("**APPLIED**".to_string());
    } else {
        lines.push(format!(
            "**REJECTED** - reason: {}",
            snap.rejected_reason.as_deref().unwrap_or("unknown")
        ));
    }

    lines.join("\n")
}
