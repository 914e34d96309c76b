//! Tests for builder modules

use std::time::Duration;

use prometheus_gatekeeper::builders::GatekeeperBuilder;
use prometheus_gatekeeper::config::GatekeeperConfig;
use prometheus_gatekeeper::core::{BoxError, CallExecutor, Gatekeeper, StatusResponse};

#[derive(Clone, Default)]
struct AlwaysOk;

impl CallExecutor<u32, StatusResponse> for AlwaysOk {
    fn call(&self, _payload: &u32) -> Result<StatusResponse, BoxError> {
        Ok(StatusResponse::new(204))
    }
}

#[test]
fn test_builder_from_config() {
    let config = GatekeeperConfig {
        pacing_interval_ms: 20,
        max_retries: 3,
        concurrency: 4,
        request_timeout_ms: 2_000,
    };

    let builder = GatekeeperBuilder::<AlwaysOk>::from_config(config.clone());
    assert_eq!(builder.config(), &config);
    assert_eq!(builder.settings(), config.normalize());
}

#[test]
fn test_builder_explicit_durations_win() {
    let builder = GatekeeperBuilder::<AlwaysOk>::new()
        .pacing_interval(Duration::from_millis(7))
        .request_timeout(Duration::from_millis(900));
    let settings = builder.settings();
    assert_eq!(settings.pacing_interval, Duration::from_millis(7));
    assert_eq!(settings.request_timeout, Duration::from_millis(900));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_builder_build_uses_default_executor() {
    let gate: Gatekeeper<u32, StatusResponse, AlwaysOk> =
        GatekeeperBuilder::new().max_retries(2).concurrency(3).build();
    assert_eq!(gate.settings().max_retries, 2);
    assert_eq!(gate.settings().concurrency, 3);

    let response = gate.call_async(1).await.expect("default executor answers");
    assert_eq!(response.status, 204);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_gatekeeper_from_config() {
    let config = GatekeeperConfig {
        concurrency: 2,
        ..GatekeeperConfig::default()
    };
    let gate: Gatekeeper<u32, StatusResponse, AlwaysOk> =
        Gatekeeper::from_config(None, AlwaysOk, &config);
    assert_eq!(gate.settings().concurrency, 2);
    assert!(gate.call_async(9).await.is_ok());
}

#[test]
fn test_builder_on_explicit_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("runtime");

    let gate: Gatekeeper<u32, StatusResponse, AlwaysOk> = GatekeeperBuilder::new()
        .runtime(runtime.handle().clone())
        .executor(AlwaysOk)
        .build();

    // Blocking calls from a plain thread.
    let response = gate.call(5).expect("blocking call");
    assert_eq!(response.status, 204);
    assert!(matches!(
        gate.submit(None),
        Err(prometheus_gatekeeper::core::CallError::EmptyRequest)
    ));
}
