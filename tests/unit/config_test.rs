//! Tests for configuration parsing and normalization

use std::time::Duration;

use prometheus_gatekeeper::config::{
    GatekeeperConfig, GatekeeperSettings, DEFAULT_REQUEST_TIMEOUT, MIN_PACING_INTERVAL,
};

#[test]
fn test_config_defaults() {
    let cfg = GatekeeperConfig::default();
    assert_eq!(cfg.pacing_interval_ms, 0);
    assert_eq!(cfg.max_retries, 0);
    assert_eq!(cfg.concurrency, 1);
    assert_eq!(cfg.request_timeout_ms, 0);

    assert_eq!(GatekeeperSettings::default(), cfg.normalize());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "pacing_interval_ms": 250,
        "max_retries": 4,
        "concurrency": 8,
        "request_timeout_ms": 5000
    }"#;

    let settings = GatekeeperConfig::from_json_str(json)
        .expect("valid json")
        .normalize();
    assert_eq!(settings.pacing_interval, Duration::from_millis(250));
    assert_eq!(settings.max_retries, 4);
    assert_eq!(settings.concurrency, 8);
    assert_eq!(settings.request_timeout, Duration::from_secs(5));
}

#[test]
fn test_config_from_partial_json() {
    let cfg = GatekeeperConfig::from_json_str(r#"{ "max_retries": 2 }"#).expect("valid json");
    assert_eq!(cfg.max_retries, 2);
    assert_eq!(cfg.concurrency, 1);
}

#[test]
fn test_config_out_of_range_values_are_accepted() {
    let json = r#"{
        "pacing_interval_ms": -10,
        "max_retries": -3,
        "concurrency": 0,
        "request_timeout_ms": 0
    }"#;

    let settings = GatekeeperConfig::from_json_str(json)
        .expect("out of range is not malformed")
        .normalize();
    assert_eq!(settings.pacing_interval, MIN_PACING_INTERVAL);
    assert_eq!(settings.max_retries, 0);
    assert_eq!(settings.concurrency, 1);
    assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
}

#[test]
fn test_config_malformed_json() {
    let err = GatekeeperConfig::from_json_str(r#"{ "concurrency": "lots" }"#).unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_config_from_lookup_all_keys() {
    let cfg = GatekeeperConfig::from_lookup(|key| {
        let value = match key {
            "GATEKEEPER_PACING_INTERVAL_MS" => "100",
            "GATEKEEPER_MAX_RETRIES" => "5",
            "GATEKEEPER_CONCURRENCY" => "10",
            "GATEKEEPER_REQUEST_TIMEOUT_MS" => "60000",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("all keys are integers");

    assert_eq!(
        cfg,
        GatekeeperConfig {
            pacing_interval_ms: 100,
            max_retries: 5,
            concurrency: 10,
            request_timeout_ms: 60_000,
        }
    );
}

#[test]
fn test_config_from_lookup_names_bad_key() {
    let err = GatekeeperConfig::from_lookup(|key| {
        (key == "GATEKEEPER_REQUEST_TIMEOUT_MS").then(|| "30s".to_string())
    })
    .unwrap_err();
    assert!(err.to_string().contains("GATEKEEPER_REQUEST_TIMEOUT_MS"));
}

#[test]
fn test_settings_sub_nanosecond_timeout() {
    let settings = GatekeeperSettings::normalize(
        Duration::from_millis(1),
        1,
        1,
        Duration::from_nanos(0),
    );
    assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);

    let settings = GatekeeperSettings::normalize(
        Duration::from_millis(1),
        1,
        1,
        Duration::from_nanos(1),
    );
    assert_eq!(settings.request_timeout, Duration::from_nanos(1));
}
