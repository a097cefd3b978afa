//! Pure accrual math. No state, no clock: callers inject `now`, which keeps
//! every computation deterministic under test.

use chrono::{DateTime, Utc};

/// Value accrued to the receiver between `started_at` and `now`, capped at
/// the deposit. Returns 0 when `now` precedes `started_at` (clock skew is an
/// edge case, not an error).
pub fn accrued(
    rate_per_sec: f64,
    deposit: f64,
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    if now < started_at {
        return 0.0;
    }
    let elapsed_secs = (now - started_at).num_milliseconds() as f64 / 1_000.0;
    (elapsed_secs * rate_per_sec).min(deposit)
}

/// Deposit not yet accrued, floored at 0.
pub fn remaining(deposit: f64, accrued: f64) -> f64 {
    (deposit - accrued).max(0.0)
}

/// Integer progress in `[0, 100]`. Callers guarantee `deposit > 0` (creation
/// invariant); a zero deposit never reaches this function.
pub fn progress_percent(accrued: f64, deposit: f64) -> u8 {
    debug_assert!(deposit > 0.0);
    (accrued / deposit * 100.0).floor().min(100.0) as u8
}
