//! # Prometheus Gatekeeper
//!
//! Client-side admission control for outbound calls.
//!
//! A [`Gatekeeper`](core::Gatekeeper) wraps a blocking request/response
//! capability (typically an HTTP client) and enforces three independent
//! controls over it:
//!
//! - **Pacing**: at most one dispatch per configured interval
//! - **Concurrency**: a hard cap on calls in flight at once
//! - **Retries**: a bounded number of attempts per request, spaced by the
//!   server's `Retry-After`-style backoff hint
//!
//! Callers submit one request at a time and wait until it resolves, times out
//! or is cancelled. The gatekeeper fails open: once it has been shut down,
//! calls go straight to the wrapped executor instead of stalling.
//!
//! ```rust
//! use std::time::Duration;
//! use prometheus_gatekeeper::core::{BoxError, CallError, Gatekeeper, StatusResponse};
//!
//! # #[tokio::main]
//! # async fn main() {
//! // An executor that always reports "service unavailable".
//! let executor = |_: &&str| -> Result<StatusResponse, BoxError> {
//!     Ok(StatusResponse::new(503).with_retry_after("0"))
//! };
//! let gate = Gatekeeper::new(None, executor, Duration::ZERO, 3, 2, Duration::from_secs(5));
//!
//! match gate.call_async("GET /health").await {
//!     Err(CallError::RetriesExceeded { attempts, response }) => {
//!         assert_eq!(attempts, 3);
//!         assert_eq!(response.status, 503);
//!     }
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: the scheduler, its request/context types and error taxonomy
//! - [`config`]: raw configuration and constructor normalization
//! - [`builders`]: builder-style construction
//! - [`runtime`]: tokio spawning
//! - `http` (feature `http-client`): a `reqwest` blocking executor

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: admission, execution and retry.
pub mod core;
/// Configuration models and normalization.
pub mod config;
/// Builders to construct gatekeepers from configuration.
pub mod builders;
/// Runtime adapters.
pub mod runtime;
/// Shared utilities.
pub mod util;
/// Blocking HTTP client integration.
#[cfg(feature = "http-client")]
pub mod http;
