//! # Harness configuration.
//!
//! Provides [`HarnessConfig`], centralized settings for one load run.
//!
//! ## Sentinel values
//! - `time_budget = 0s` → no global budget (run until done or interrupted)
//! - `max_param = 0` → treated as 1 (every worker gets parameter `"0"`)
//! - `channel_capacity = 0` → treated as 1

use std::time::Duration;

use crate::policies::QueryRetryPolicy;

/// Settings for one load run.
///
/// ## Field semantics
/// - `workers`: concurrent workers, each with one instance in flight at most
/// - `iterations`: dispatch-and-wait cycles per worker
/// - `max_param`: worker `i` (1-based) is assigned parameter `i % max_param`
/// - `poll_interval`: fixed delay between state queries of one instance
/// - `channel_capacity`: outstanding outcomes before workers wait on the aggregator
/// - `bus_capacity`: event bus ring buffer size
/// - `time_budget`: global deadline after which the run is cancelled (`0s` = none)
/// - `task_name` / `param_key`: which task decides success and which dispatch key carries the parameter
/// - `query_retry`: bounded retry of failed state queries (default: none)
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub workers: usize,
    pub iterations: u32,
    pub max_param: u32,
    pub poll_interval: Duration,
    pub channel_capacity: usize,
    pub bus_capacity: usize,
    pub time_budget: Duration,
    pub task_name: String,
    pub param_key: String,
    pub query_retry: QueryRetryPolicy,
}

impl HarnessConfig {
    /// Returns the global time budget as an `Option`.
    #[inline]
    pub fn time_budget(&self) -> Option<Duration> {
        if self.time_budget == Duration::ZERO {
            None
        } else {
            Some(self.time_budget)
        }
    }

    #[inline]
    pub fn channel_capacity_clamped(&self) -> usize {
        self.channel_capacity.max(1)
    }

    #[inline]
    pub fn max_param_clamped(&self) -> u32 {
        self.max_param.max(1)
    }
}

impl Default for HarnessConfig {
    /// - `workers = 50`, `iterations = 10`, `max_param = 3`
    /// - `poll_interval = 3s`
    /// - `channel_capacity = 100`, `bus_capacity = 1024`
    /// - `time_budget = 0s` (none)
    /// - task `sleeper`, parameter key `dur`
    /// - no query retries
    fn default() -> Self {
        Self {
            workers: 50,
            iterations: 10,
            max_param: 3,
            poll_interval: Duration::from_secs(3),
            channel_capacity: 100,
            bus_capacity: 1024,
            time_budget: Duration::ZERO,
            task_name: "sleeper".to_string(),
            param_key: "dur".to_string(),
            query_retry: QueryRetryPolicy::never(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_normalized() {
        let cfg = HarnessConfig {
            max_param: 0,
            channel_capacity: 0,
            ..HarnessConfig::default()
        };
        assert_eq!(cfg.time_budget(), None);
        assert_eq!(cfg.max_param_clamped(), 1);
        assert_eq!(cfg.channel_capacity_clamped(), 1);
    }

    #[test]
    fn budget_is_optional() {
        let cfg = HarnessConfig {
            time_budget: Duration::from_secs(30),
            ..HarnessConfig::default()
        };
        assert_eq!(cfg.time_budget(), Some(Duration::from_secs(30)));
    }
}
