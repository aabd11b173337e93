//! Failure injection tests for the load balancer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use loadbalancer::config::BackendConfig;

mod common;

#[tokio::test]
async fn test_prefers_backend_with_most_capacity() {
    let small = common::start_mock_backend("small").await;
    let large = common::start_mock_backend("large").await;

    let config = common::test_config(vec![
        BackendConfig::new(small.to_string(), 5),
        BackendConfig::new(large.to_string(), 10),
    ]);
    let (proxy, _pool, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}/hello", proxy))
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "large");

    shutdown.trigger();
}

#[tokio::test]
async fn test_retry_same_backend_then_succeed() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let backend = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "Service Unavailable".into())
            } else {
                (200, "Success".into())
            }
        }
    })
    .await;

    let config = common::test_config(vec![BackendConfig::new(backend.to_string(), 10)]);
    let (proxy, pool, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK, "Should succeed after retries");
    assert_eq!(res.text().await.unwrap(), "Success");
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
    assert!(pool.find(&backend.to_string()).unwrap().is_alive());

    shutdown.trigger();
}

#[tokio::test]
async fn test_failover_to_alive_backend() {
    let dead = common::unused_address();
    let alive = common::start_mock_backend("alive").await;

    let config = common::test_config(vec![
        BackendConfig::new(dead.to_string(), 10),
        BackendConfig::new(alive.to_string(), 5),
    ]);
    let (proxy, pool, shutdown) = common::start_proxy(config).await;

    let client = common::client();
    let res = client.get(format!("http://{}", proxy)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "alive");
    assert!(!pool.find(&dead.to_string()).unwrap().is_alive());

    // The dead backend is skipped from now on.
    for _ in 0..5 {
        let res = client.get(format!("http://{}", proxy)).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), "alive");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_always_failing_backend_yields_503() {
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    let backend = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            (502, "bad".into())
        }
    })
    .await;

    let config = common::test_config(vec![BackendConfig::new(backend.to_string(), 10)]);
    let (proxy, pool, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "Service not available");
    assert_eq!(call_count.load(Ordering::SeqCst), 4, "One try plus three retries");
    assert!(!pool.find(&backend.to_string()).unwrap().is_alive());

    // With no alive backend the next request fails without forwarding.
    let res = common::client()
        .get(format!("http://{}", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(call_count.load(Ordering::SeqCst), 4);

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_deadline_yields_503() {
    let backend = common::start_programmable_backend(|| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        (200, "late".into())
    })
    .await;

    let mut config = common::test_config(vec![BackendConfig::new(backend.to_string(), 10)]);
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_secs = 2;
    let (proxy, _pool, shutdown) = common::start_proxy(config).await;

    let started = Instant::now();
    let res = common::client()
        .get(format!("http://{}", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "Service not available");
    assert!(started.elapsed() < Duration::from_secs(5));

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_propagated() {
    let backend = common::start_mock_backend("ok").await;
    let config = common::test_config(vec![BackendConfig::new(backend.to_string(), 10)]);
    let (proxy, _pool, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{}", proxy))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-42");

    shutdown.trigger();
}

#[tokio::test]
async fn test_health_check_revives_backend() {
    let addr = common::unused_address();

    let mut config = common::test_config(vec![BackendConfig::new(addr.to_string(), 10)]);
    config.health_check.enabled = true;
    config.health_check.interval_secs = 1;
    config.health_check.timeout_ms = 200;
    let (proxy, pool, shutdown) = common::start_proxy(config).await;

    // First probe runs immediately and finds nothing listening.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!pool.find(&addr.to_string()).unwrap().is_alive());
    let res = common::client().get(format!("http://{}", proxy)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    common::start_mock_backend_at(addr, "back").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(pool.find(&addr.to_string()).unwrap().is_alive());

    let res = common::client().get(format!("http://{}", proxy)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "back");

    shutdown.trigger();
}
