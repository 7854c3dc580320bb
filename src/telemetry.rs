// src/telemetry.rs
//! One-time metric registration so series carry descriptions regardless of
//! which recorder the host installs.

use metrics::describe_counter;
use once_cell::sync::OnceCell;

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "adapt_cycles_total",
            "Adaptation cycles reaching a terminal state, labeled by outcome."
        );
    });
}
