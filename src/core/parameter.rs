//! # Work parameters.
//!
//! Each worker receives one parameter at pool creation and keeps it for its
//! whole life. Worker `i` (1-based) gets `i % max_param`, which spreads the
//! pool over `0..max_param`.

use std::fmt;
use std::sync::Arc;

/// Opaque value dispatched with every instance of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkParameter(Arc<str>);

impl WorkParameter {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// Parameter for the worker with 1-based `ordinal`.
    pub fn distribute(ordinal: usize, max_param: u32) -> Self {
        let modulo = u64::from(max_param.max(1));
        Self::new((ordinal as u64 % modulo).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn shared(&self) -> Arc<str> {
        Arc::clone(&self.0)
    }
}

impl fmt::Display for WorkParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo_spread_over_range() {
        let params: Vec<String> = (1..=7)
            .map(|i| WorkParameter::distribute(i, 3).to_string())
            .collect();
        assert_eq!(params, ["1", "2", "0", "1", "2", "0", "1"]);
    }

    #[test]
    fn zero_range_collapses_to_zero() {
        assert_eq!(WorkParameter::distribute(5, 0).as_str(), "0");
    }
}
