//! Gatekeeper configuration and constructor normalization.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::core::AppResult;

/// Per-request timeout used when none (or a sub-nanosecond one) is given.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Smallest pacing interval; effectively immediate pacing.
pub const MIN_PACING_INTERVAL: Duration = Duration::from_nanos(1);

/// Raw gatekeeper configuration.
///
/// Fields are signed so that out-of-range values coming from configuration
/// files or the environment can be normalized instead of rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Minimum interval between dispatches, in milliseconds.
    pub pacing_interval_ms: i64,
    /// Maximum executor invocations per request.
    pub max_retries: i64,
    /// Maximum concurrently executing calls.
    pub concurrency: i64,
    /// Per-request timeout, in milliseconds.
    pub request_timeout_ms: i64,
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: 0,
            max_retries: 0,
            concurrency: 1,
            request_timeout_ms: 0,
        }
    }
}

impl GatekeeperConfig {
    /// Parse configuration from a JSON string.
    ///
    /// Out-of-range values are accepted and normalized later; only malformed
    /// JSON is an error.
    ///
    /// # Errors
    ///
    /// Returns a message describing the parse failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))
    }

    /// Load configuration from `GATEKEEPER_*` environment variables, after
    /// reading a `.env` file if one is present. Unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable is set but is not an integer.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Fails if a present value is not an integer.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let read = |key: &str, slot: &mut i64| -> AppResult<()> {
            if let Some(raw) = lookup(key) {
                *slot = raw
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("{key}={raw:?} is not an integer: {e}"))?;
            }
            Ok(())
        };
        read("GATEKEEPER_PACING_INTERVAL_MS", &mut cfg.pacing_interval_ms)?;
        read("GATEKEEPER_MAX_RETRIES", &mut cfg.max_retries)?;
        read("GATEKEEPER_CONCURRENCY", &mut cfg.concurrency)?;
        read("GATEKEEPER_REQUEST_TIMEOUT_MS", &mut cfg.request_timeout_ms)?;
        Ok(cfg)
    }

    /// Apply constructor normalization.
    #[must_use]
    pub fn normalize(&self) -> GatekeeperSettings {
        GatekeeperSettings::normalize(
            millis(self.pacing_interval_ms),
            self.max_retries,
            self.concurrency,
            millis(self.request_timeout_ms),
        )
    }
}

fn millis(value: i64) -> Duration {
    u64::try_from(value).map_or(Duration::ZERO, Duration::from_millis)
}

/// Normalized, immutable scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatekeeperSettings {
    /// Interval between pacing ticks; always positive.
    pub pacing_interval: Duration,
    /// Retry budget; zero disables retries.
    pub max_retries: u32,
    /// Size of the concurrency token pool; at least one and at most
    /// [`Semaphore::MAX_PERMITS`].
    pub concurrency: usize,
    /// Per-request timeout; at least one nanosecond.
    pub request_timeout: Duration,
}

impl GatekeeperSettings {
    /// Normalize raw constructor inputs. Never fails:
    ///
    /// | input | invalid when | becomes |
    /// |---|---|---|
    /// | `request_timeout` | below 1 ns | [`DEFAULT_REQUEST_TIMEOUT`] |
    /// | `retries` | negative | 0 |
    /// | `delay` | zero | [`MIN_PACING_INTERVAL`] |
    /// | `concurrency` | below 1 | 1 |
    /// | `concurrency` | above [`Semaphore::MAX_PERMITS`] | [`Semaphore::MAX_PERMITS`] |
    #[must_use]
    pub fn normalize(
        delay: Duration,
        retries: i64,
        concurrency: i64,
        request_timeout: Duration,
    ) -> Self {
        let request_timeout = if request_timeout < Duration::from_nanos(1) {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            request_timeout
        };
        let pacing_interval = if delay.is_zero() {
            MIN_PACING_INTERVAL
        } else {
            delay
        };

        Self {
            pacing_interval,
            max_retries: u32::try_from(retries.max(0)).unwrap_or(u32::MAX),
            concurrency: usize::try_from(concurrency.max(1))
                .unwrap_or(usize::MAX)
                .min(Semaphore::MAX_PERMITS),
            request_timeout,
        }
    }
}

impl Default for GatekeeperSettings {
    fn default() -> Self {
        GatekeeperConfig::default().normalize()
    }
}
