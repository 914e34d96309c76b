//! Tests for tokio spawner utilities

use prometheus_gatekeeper::runtime::tokio_spawner::TokioSpawner;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let handle = spawner.spawn(async move { 123 });
    let result = handle.await.expect("task result");
    assert_eq!(result, 123);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn_blocking() {
    let spawner = TokioSpawner::current();

    let handle = spawner.spawn_blocking(|| {
        std::thread::sleep(std::time::Duration::from_millis(5));
        "done"
    });
    assert_eq!(handle.await.expect("blocking result"), "done");
}
