//! Core scheduling abstractions: admission, execution and retry.

pub mod backoff;
pub mod context;
pub mod error;
pub mod executor;
pub mod gate;
pub mod gatekeeper;
pub mod request;

pub use backoff::{parse_retry_hint, retry_backoff, BackoffError, BackoffHint};
pub use context::RequestContext;
pub use error::{AppResult, BoxError, CallError, GateError};
pub use executor::{CallExecutor, CallOutcome, StatusResponse};
pub use gate::AdmissionGate;
pub use gatekeeper::Gatekeeper;
pub use request::{CallRequest, Reply};
