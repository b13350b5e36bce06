//! Freshness Policy
//!
//! The single predicate deciding whether an entry is still valid. Point reads,
//! collection scans and the background sweep all go through [`is_fresh`].

use chrono::{DateTime, Duration, Utc};

use crate::cache::FRESHNESS_HORIZON_HOURS;

/// Returns the process-wide freshness horizon.
pub fn freshness_horizon() -> Duration {
    Duration::hours(FRESHNESS_HORIZON_HOURS)
}

// == Is Fresh ==
/// Checks whether an entry captured at `captured_at` is still valid at `now`.
///
/// Boundary condition: an entry whose age equals the horizon is expired.
/// Entries stamped in the future (clock skew) count as fresh.
pub fn is_fresh(captured_at: DateTime<Utc>, now: DateTime<Utc>, horizon: Duration) -> bool {
    now.signed_duration_since(captured_at) < horizon
}
