//! Bounded sleep-poll loops.

use std::time::Duration;

use crate::error::Result;


/// Interval between completion checks of a running script.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The number of `interval`-spaced attempts that fit in `timeout`.
pub fn attempts(timeout: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 1;
    }
    u64::try_from(timeout.as_nanos() / interval.as_nanos()).unwrap_or(u64::MAX)
}

/// Calls `check` up to `attempts` times, sleeping `interval` after each call that yields
/// nothing.
///
/// Returns the first value produced, or `None` once the attempts are exhausted.
pub fn poll<T, F>(interval: Duration, attempts: u64, mut check: F) -> Result<Option<T>>
where
    F: FnMut() -> Result<Option<T>>,
{
    for _ in 0..attempts {
        if let Some(value) = check()? {
            return Ok(Some(value));
        }
        std::thread::sleep(interval);
    }
    Ok(None)
}
