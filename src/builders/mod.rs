//! Builders that assemble a gatekeeper from configuration.

pub mod gatekeeper_builder;

pub use gatekeeper_builder::GatekeeperBuilder;
