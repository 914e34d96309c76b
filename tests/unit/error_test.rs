//! Tests for error types

use prometheus_gatekeeper::core::{CallError, GateError, StatusResponse};

#[test]
fn test_context_errors() {
    assert_eq!(format!("{}", GateError::Cancelled), "context canceled");
    assert_eq!(
        format!("{}", GateError::DeadlineExceeded),
        "context deadline exceeded"
    );
}

#[test]
fn test_backend_error() {
    let err = GateError::Backend("task was cancelled".to_string());
    assert_eq!(format!("{}", err), "backend error: task was cancelled");
}

#[test]
fn test_empty_request_error() {
    let err: CallError<StatusResponse> = CallError::EmptyRequest;
    assert_eq!(format!("{}", err), "request cannot be empty");
    assert!(err.into_response().is_none());
}

#[test]
fn test_null_response_without_source() {
    let err: CallError<StatusResponse> = CallError::NullResponse { source: None };
    assert_eq!(format!("{}", err), "request returned a null response");
}

#[test]
fn test_retries_exceeded_keeps_response() {
    let err = CallError::RetriesExceeded {
        attempts: 3,
        response: StatusResponse::new(429).with_retry_after("7"),
    };
    assert!(!err.is_context());
    let response = err.into_response().expect("final response");
    assert_eq!(response.status, 429);
    assert_eq!(response.retry_after.as_deref(), Some("7"));
}

#[test]
fn test_closed_prematurely_error() {
    let err: CallError<StatusResponse> = CallError::ClosedPrematurely;
    assert_eq!(format!("{}", err), "response channel closed prematurely");
    assert_eq!(format!("{:?}", err), "ClosedPrematurely");
}
