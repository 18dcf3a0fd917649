//! # Bounded retry for state queries.
//!
//! A failed state query ends the attempt with a query error unless the
//! [`QueryRetryPolicy`] allows another try:
//!
//! ```text
//! max_retries = 0  → first failure is reported (default)
//! max_retries = n  → up to n extra queries, sleeping backoff.next(k) before the k-th
//! ```
//!
//! Retry sleeps are cancellable; a cancelled sleep ends the attempt as cancelled.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Policy controlling retries of failed state queries within one poll tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryRetryPolicy {
    /// Extra queries allowed after the first failure.
    pub max_retries: u32,
    /// Delay between retries.
    pub backoff: BackoffPolicy,
}

impl QueryRetryPolicy {
    /// No retries: every query failure is reported immediately.
    pub const fn never() -> Self {
        Self {
            max_retries: 0,
            backoff: BackoffPolicy::constant(Duration::from_millis(100)),
        }
    }

    /// Returns the delay before retry number `retry` (0-based), or `None` when exhausted.
    pub fn delay_for(&self, retry: u32) -> Option<Duration> {
        (retry < self.max_retries).then(|| self.backoff.next(retry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::JitterPolicy;

    #[test]
    fn never_retries_by_default() {
        assert_eq!(QueryRetryPolicy::default().delay_for(0), None);
        assert_eq!(QueryRetryPolicy::never().delay_for(0), None);
    }

    #[test]
    fn bounded_retries_follow_backoff() {
        let policy = QueryRetryPolicy {
            max_retries: 2,
            backoff: BackoffPolicy {
                first: Duration::from_millis(100),
                max: Duration::from_secs(1),
                factor: 2.0,
                jitter: JitterPolicy::None,
            },
        };
        assert_eq!(policy.delay_for(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for(2), None);
    }
}
