//! Request pacing: randomized inter-request delays and exponential backoff.

use std::time::Duration;

use rand::Rng;

/// Pick a delay uniformly from `[min, max]`.
///
/// Returns `min` when the range is empty or degenerate.
#[must_use]
pub fn pick_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::rng().random_range(min..=max)
}

/// Sleep for a random duration in `[min, max]`.
pub async fn random_delay(min: Duration, max: Duration) {
    let delay = pick_delay(min, max);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Exponential backoff: `base * 2^attempt`, saturating instead of
/// overflowing on extreme inputs.
///
/// | Attempt | Wait (`base = 2s`) |
/// |---------|--------------------|
/// | 0       | 2 s                |
/// | 1       | 4 s                |
/// | 2       | 8 s                |
#[must_use]
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Sleep for `delay`, skipping the timer entirely for zero.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
