//! Executor and outcome traits for wrapped calls.

use super::BoxError;

/// The wrapped, blocking capability whose calls are throttled.
///
/// Implementations are invoked from the runtime's blocking thread pool and
/// may be called from several threads at once, so they must be safe for
/// concurrent use. The payload is borrowed because a retried request hands
/// the same payload to the executor again.
///
/// # Example
///
/// ```rust
/// use prometheus_gatekeeper::core::{BoxError, CallExecutor};
///
/// struct Echo;
///
/// impl CallExecutor<String, String> for Echo {
///     fn call(&self, payload: &String) -> Result<String, BoxError> {
///         Ok(payload.clone())
///     }
/// }
/// ```
pub trait CallExecutor<P, R>: Send + Sync + 'static {
    /// Perform one call. An `Err` means no response object was produced.
    fn call(&self, payload: &P) -> Result<R, BoxError>;
}

impl<P, R, F> CallExecutor<P, R> for F
where
    F: Fn(&P) -> Result<R, BoxError> + Send + Sync + 'static,
{
    fn call(&self, payload: &P) -> Result<R, BoxError> {
        self(payload)
    }
}

/// What the scheduler reads from a response to classify it.
pub trait CallOutcome: Send + 'static {
    /// The response carries a success code (for HTTP, status below 300).
    fn is_success(&self) -> bool;

    /// The response reports that the target does not exist. Such responses
    /// are never retried.
    fn is_not_found(&self) -> bool;

    /// Server-supplied backoff hint, e.g. a `Retry-After` header value.
    fn retry_hint(&self) -> Option<String> {
        None
    }

    /// Release resources held by a response that is about to be discarded
    /// before a retry, such as an unread body. Runs on the blocking pool.
    fn release(&mut self) {}
}

/// A minimal status-coded response, useful for executors that are not HTTP
/// clients but still speak in status codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    /// Numeric status, HTTP-style.
    pub status: u16,
    /// Optional retry hint.
    pub retry_after: Option<String>,
}

impl StatusResponse {
    /// Response with a status and no hint.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
        }
    }

    /// Attach a retry hint.
    #[must_use]
    pub fn with_retry_after(mut self, hint: impl Into<String>) -> Self {
        self.retry_after = Some(hint.into());
        self
    }
}

impl CallOutcome for StatusResponse {
    fn is_success(&self) -> bool {
        self.status < 300
    }

    fn is_not_found(&self) -> bool {
        self.status == 404
    }

    fn retry_hint(&self) -> Option<String> {
        self.retry_after.clone()
    }
}
