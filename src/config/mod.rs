//! Configuration models for the gatekeeper.

pub mod gatekeeper;

pub use gatekeeper::{
    GatekeeperConfig, GatekeeperSettings, DEFAULT_REQUEST_TIMEOUT, MIN_PACING_INTERVAL,
};
