// src/error.rs
//! Library error taxonomy. Rejected adaptation outcomes are *not* errors;
//! they live in `cycle::CycleOutcome`. Errors here abort the current cycle.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RankerError {
    /// A persisted RankConfig failed bounds validation. Fatal on load; never
    /// silently clamped, since that would mask whatever wrote the bad value.
    #[error("malformed rank config: {reason}")]
    MalformedConfig { reason: String },

    /// Read/write contract against the backing store failed. The cycle
    /// aborts with no partial snapshot written.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
