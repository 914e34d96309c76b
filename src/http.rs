//! Blocking HTTP client integration.
//!
//! [`HttpExecutor`] wraps a `reqwest` blocking client so a [`Gatekeeper`]
//! can stand in front of it. Responses are classified by status code and
//! retried according to their `Retry-After` header.
//!
//! [`Gatekeeper`]: crate::core::Gatekeeper

use std::io;

use reqwest::blocking::{Client, Request, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use crate::core::{BoxError, CallExecutor, CallOutcome};

/// Sends requests with a blocking `reqwest` client.
///
/// Each attempt sends a clone of the request, so bodies must be cloneable
/// (anything but a streaming reader).
#[derive(Debug, Clone, Default)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Wrap an existing client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

impl CallExecutor<Request, Response> for HttpExecutor {
    fn call(&self, payload: &Request) -> Result<Response, BoxError> {
        let request = payload
            .try_clone()
            .ok_or("request body cannot be cloned for sending")?;
        Ok(self.client.execute(request)?)
    }
}

impl CallOutcome for Response {
    fn is_success(&self) -> bool {
        self.status().as_u16() < 300
    }

    fn is_not_found(&self) -> bool {
        self.status() == StatusCode::NOT_FOUND
    }

    fn retry_hint(&self) -> Option<String> {
        self.headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// Read the body to the end so the connection can be reused.
    fn release(&mut self) {
        let _ = io::copy(self, &mut io::sink());
    }
}
