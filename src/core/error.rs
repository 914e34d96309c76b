//! Error types for gatekeeper operations.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by wrapped executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the scheduler's own machinery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The operative context was cancelled.
    #[error("context canceled")]
    Cancelled,
    /// The operative context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// The executor panicked while handling a call.
    #[error("panic occurred while executing request: {0}")]
    ExecutorPanicked(String),
    /// Runtime-level failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors returned to callers of the gatekeeper facade.
///
/// Generic over the response type so that a terminal, non-successful
/// response is handed back to the caller instead of being discarded.
pub enum CallError<R> {
    /// No request was supplied.
    EmptyRequest,
    /// The executor produced no usable response.
    NullResponse {
        /// Failure reported by the executor, if any.
        source: Option<BoxError>,
    },
    /// The request was not retried further: the retry budget is spent,
    /// retries are disabled, or the target reported not-found.
    RetriesExceeded {
        /// Number of executor invocations made for this request.
        attempts: u32,
        /// The last response observed.
        response: R,
    },
    /// The operative context ended before a reply arrived.
    Context(GateError),
    /// The reply channel closed without delivering a value.
    ClosedPrematurely,
}

impl<R> CallError<R> {
    /// The final response carried by the error, if there is one.
    pub fn into_response(self) -> Option<R> {
        match self {
            Self::RetriesExceeded { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Returns true when the caller's context ended first.
    pub const fn is_context(&self) -> bool {
        matches!(self, Self::Context(_))
    }
}

impl<R> fmt::Debug for CallError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest => f.write_str("EmptyRequest"),
            Self::NullResponse { source } => f
                .debug_struct("NullResponse")
                .field("source", source)
                .finish(),
            Self::RetriesExceeded { attempts, .. } => f
                .debug_struct("RetriesExceeded")
                .field("attempts", attempts)
                .finish_non_exhaustive(),
            Self::Context(err) => f.debug_tuple("Context").field(err).finish(),
            Self::ClosedPrematurely => f.write_str("ClosedPrematurely"),
        }
    }
}

impl<R> fmt::Display for CallError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest => write!(f, "request cannot be empty"),
            Self::NullResponse { source: Some(err) } => {
                write!(f, "request returned a null response: {err}")
            }
            Self::NullResponse { source: None } => write!(f, "request returned a null response"),
            Self::RetriesExceeded { attempts, .. } => {
                write!(f, "retries exceeded for request after {attempts} attempt(s)")
            }
            Self::Context(err) => write!(f, "{err}"),
            Self::ClosedPrematurely => write!(f, "response channel closed prematurely"),
        }
    }
}

impl<R> std::error::Error for CallError<R> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NullResponse { source: Some(err) } => Some(err.as_ref()),
            Self::Context(err) => Some(err),
            _ => None,
        }
    }
}

impl<R> From<GateError> for CallError<R> {
    fn from(err: GateError) -> Self {
        Self::Context(err)
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
