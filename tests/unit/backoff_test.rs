//! Tests for retry hint parsing

use std::time::{Duration, SystemTime};

use prometheus_gatekeeper::core::{parse_retry_hint, retry_backoff, BackoffError, BackoffHint};

#[test]
fn test_seconds_hint() {
    assert_eq!(retry_backoff(Some("5")), Duration::from_secs(5));
    assert_eq!(retry_backoff(Some("5s")), Duration::from_secs(5));
    assert_eq!(retry_backoff(Some("0")), Duration::ZERO);
}

#[test]
fn test_missing_or_malformed_hint() {
    assert_eq!(retry_backoff(None), Duration::ZERO);
    assert_eq!(retry_backoff(Some("")), Duration::ZERO);
    assert_eq!(retry_backoff(Some("tomorrow")), Duration::ZERO);
    assert_eq!(
        parse_retry_hint("tomorrow"),
        Err(BackoffError::Malformed("tomorrow".to_string()))
    );
}

#[test]
fn test_http_date_hint() {
    let hint = parse_retry_hint("Sun, 06 Nov 1994 08:49:37 GMT").expect("http date");
    let BackoffHint::At(at) = hint else {
        panic!("expected an absolute hint");
    };
    assert_eq!(
        at.duration_since(SystemTime::UNIX_EPOCH).expect("after epoch"),
        Duration::from_secs(784_111_777)
    );
    // Long past: retry immediately.
    assert_eq!(retry_backoff(Some("Sun, 06 Nov 1994 08:49:37 GMT")), Duration::ZERO);
}

#[test]
fn test_future_http_date_hint() {
    let at = SystemTime::now() + Duration::from_secs(120);
    let hint = httpdate::fmt_http_date(at);
    let delay = retry_backoff(Some(&hint));
    assert!(delay > Duration::from_secs(115));
    assert!(delay <= Duration::from_secs(120));
}
