// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! REQ socket configuration.
//!
//! - **Static**: protocol constants below are the single source of truth for
//!   defaults. Do not hardcode them elsewhere.
//! - **Dynamic**: [`ReqConfig`] carries the per-socket values, with optional
//!   overrides read from the environment:
//!
//! - `SPREQ_RESEND_IVL_MS`: resend interval in milliseconds (default: 60000)
//! - `SPREQ_POLL_INTERVAL_US`: driver poll period while a receive is waiting,
//!   in microseconds (default: 1000)
//!
//! # Example
//!
//! ```
//! use spreq::ReqConfig;
//! use std::time::Duration;
//!
//! let config = ReqConfig::default().with_resend_interval(Duration::from_secs(5));
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;

/// Default resend interval in milliseconds.
pub const DEFAULT_RESEND_IVL_MS: u64 = 60_000;

/// Largest resend interval, in milliseconds (the `RESEND_IVL` option is an
/// `i32`).
pub const MAX_RESEND_IVL_MS: u64 = i32::MAX as u64;

/// Default driver poll period while a receive is waiting, in microseconds.
pub const DEFAULT_POLL_INTERVAL_US: u64 = 1_000;

/// Default queue depth of each direction of an in-memory raw socket pair.
pub const DEFAULT_RAW_CAPACITY: usize = 64;

/// Environment variable overriding the resend interval (ms)
pub const ENV_RESEND_IVL_MS: &str = "SPREQ_RESEND_IVL_MS";
/// Environment variable overriding the driver poll interval (us)
pub const ENV_POLL_INTERVAL_US: &str = "SPREQ_POLL_INTERVAL_US";

/// Per-socket configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReqConfig {
    /// Delay before an unanswered request is dispatched again.
    pub resend_interval: Duration,

    /// How often the driver polls the raw socket while a receive is waiting.
    pub poll_interval: Duration,
}

impl Default for ReqConfig {
    fn default() -> Self {
        Self {
            resend_interval: Duration::from_millis(DEFAULT_RESEND_IVL_MS),
            poll_interval: Duration::from_micros(DEFAULT_POLL_INTERVAL_US),
        }
    }
}

impl ReqConfig {
    /// Defaults overridden by `SPREQ_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, ENV_RESEND_IVL_MS) {
            if ms <= MAX_RESEND_IVL_MS {
                config.resend_interval = Duration::from_millis(ms);
            } else {
                log::warn!(
                    "[config] Ignoring {}={}: above {} ms",
                    ENV_RESEND_IVL_MS,
                    ms,
                    MAX_RESEND_IVL_MS
                );
            }
        }
        if let Some(us) = parse_var(&lookup, ENV_POLL_INTERVAL_US) {
            config.poll_interval = Duration::from_micros(us);
        }

        config
    }

    /// Set the resend interval.
    #[must_use]
    pub fn with_resend_interval(mut self, interval: Duration) -> Self {
        self.resend_interval = interval;
        self
    }

    /// Set the driver poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check the configuration for values the socket cannot work with.
    ///
    /// The resend interval must fit the `RESEND_IVL` option (an `i32` of
    /// milliseconds); the poll interval must be non-zero.
    pub fn validate(&self) -> Result<()> {
        check_resend_interval(self.resend_interval)?;
        if self.poll_interval.is_zero() {
            return Err(Error::invalid("poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Reject resend intervals above [`MAX_RESEND_IVL_MS`].
pub fn check_resend_interval(interval: Duration) -> Result<()> {
    if interval.as_millis() > u128::from(MAX_RESEND_IVL_MS) {
        return Err(Error::invalid(format!(
            "resend interval {:?} exceeds {} ms",
            interval, MAX_RESEND_IVL_MS
        )));
    }
    Ok(())
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key).filter(|s| !s.is_empty())?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("[config] Ignoring {}={:?}: not an unsigned integer", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ReqConfig::default();
        assert_eq!(config.resend_interval, Duration::from_millis(60_000));
        assert_eq!(config.poll_interval, Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides() {
        let config = ReqConfig::from_lookup(lookup_from(&[
            (ENV_RESEND_IVL_MS, "250"),
            (ENV_POLL_INTERVAL_US, " 50 "),
        ]));
        assert_eq!(config.resend_interval, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_micros(50));
    }

    #[test]
    fn garbage_env_values_are_ignored() {
        let config = ReqConfig::from_lookup(lookup_from(&[
            (ENV_RESEND_IVL_MS, "soon"),
            (ENV_POLL_INTERVAL_US, ""),
        ]));
        assert_eq!(config, ReqConfig::default());
    }

    #[test]
    fn validate_rejects_zero_poll_and_huge_interval() {
        let config = ReqConfig::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = ReqConfig::default().with_resend_interval(Duration::from_secs(u64::MAX / 2));
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let config = ReqConfig::default().with_resend_interval(Duration::MAX);
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn resend_interval_bound_is_inclusive() {
        assert!(check_resend_interval(Duration::from_millis(MAX_RESEND_IVL_MS)).is_ok());
        assert!(check_resend_interval(Duration::from_millis(MAX_RESEND_IVL_MS + 1)).is_err());
        assert!(check_resend_interval(Duration::ZERO).is_ok());
    }

    #[test]
    fn out_of_range_env_interval_is_ignored() {
        let config = ReqConfig::from_lookup(lookup_from(&[(
            ENV_RESEND_IVL_MS,
            "18446744073709551615",
        )]));
        assert_eq!(config, ReqConfig::default());
        assert!(config.validate().is_ok());

        let config = ReqConfig::from_lookup(lookup_from(&[(ENV_RESEND_IVL_MS, "2147483648")]));
        assert_eq!(config, ReqConfig::default());
    }
}
