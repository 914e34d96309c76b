//! Backoff computation from server-supplied retry hints.
//!
//! A hint is either an HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`) or a
//! number of seconds, with or without a trailing `s` (`"5"` and `"5s"` are
//! both five seconds). Anything else means "retry immediately".

use std::time::{Duration, SystemTime};

use thiserror::Error;

/// Errors raised while interpreting a retry hint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackoffError {
    /// The hint is neither a date nor a seconds value.
    #[error("unable to parse retry hint '{0}'")]
    Malformed(String),
}

/// A successfully interpreted retry hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffHint {
    /// Absolute point in time after which the call may be retried.
    At(SystemTime),
    /// Relative delay.
    After(Duration),
}

impl BackoffHint {
    /// Delay from `now` until the hint allows a retry.
    ///
    /// Dates already in the past yield zero, so the retry fires at once.
    #[must_use]
    pub fn delay_from(self, now: SystemTime) -> Duration {
        match self {
            Self::At(at) => at.duration_since(now).unwrap_or(Duration::ZERO),
            Self::After(delay) => delay,
        }
    }
}

/// Interpret a non-empty retry hint.
///
/// # Errors
///
/// Returns [`BackoffError::Malformed`] when the hint is not a recognised date
/// or seconds value.
pub fn parse_retry_hint(hint: &str) -> Result<BackoffHint, BackoffError> {
    let hint = hint.trim();
    if let Ok(at) = httpdate::parse_http_date(hint) {
        return Ok(BackoffHint::At(at));
    }

    let seconds = hint.strip_suffix('s').unwrap_or(hint);
    parse_seconds(seconds)
        .map(BackoffHint::After)
        .ok_or_else(|| BackoffError::Malformed(hint.to_string()))
}

/// Seconds may be fractional (`"1.5s"`); negative values are rejected.
fn parse_seconds(value: &str) -> Option<Duration> {
    if value.is_empty() || value.starts_with('-') {
        return None;
    }
    if let Ok(whole) = value.parse::<u64>() {
        return Some(Duration::from_secs(whole));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Compute how long to wait before re-submitting a retryable request.
///
/// Missing, empty and malformed hints all yield zero.
#[must_use]
pub fn retry_backoff(hint: Option<&str>) -> Duration {
    retry_backoff_at(hint, SystemTime::now())
}

/// [`retry_backoff`] against an explicit clock reading.
#[must_use]
pub fn retry_backoff_at(hint: Option<&str>, now: SystemTime) -> Duration {
    match hint.map(str::trim) {
        None | Some("") => Duration::ZERO,
        Some(hint) => match parse_retry_hint(hint) {
            Ok(parsed) => parsed.delay_from(now),
            Err(err) => {
                tracing::trace!(error = %err, "ignoring retry hint");
                Duration::ZERO
            }
        },
    }
}
