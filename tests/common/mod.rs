#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rediska::{CacheConfig, CacheRegistry};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

static NAMESPACE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Redis endpoint used by the live integration tests.
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string())
}

/// A namespace unique per test run, so concurrent test processes sharing one
/// Redis instance cannot observe each other's keys.
pub fn unique_namespace(test_name: &str) -> String {
    format!(
        "rediska-test:{}:{}:{}:",
        std::process::id(),
        test_name,
        NAMESPACE_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Builds a registry against the live Redis endpoint with a unique namespace
/// and a short reconnect budget.
pub fn live_registry(test_name: &str) -> CacheRegistry {
    let config = CacheConfig {
        redis_url: redis_url(),
        namespace: unique_namespace(test_name),
        backoff_base: Duration::from_millis(10),
        backoff_ceiling: Duration::from_millis(100),
        max_connect_attempts: 3,
        ..CacheConfig::default()
    };

    CacheRegistry::init(config).unwrap()
}

/// Writes raw bytes directly to a fully-namespaced key, bypassing the codec.
/// Used to simulate corrupt cache entries.
pub async fn plant_raw_bytes(key: &str, bytes: &[u8]) {
    let client = redis::Client::open(redis_url().as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();

    let _: () = redis::cmd("SET")
        .arg(key)
        .arg(bytes)
        .query_async(&mut conn)
        .await
        .unwrap();
}

/// A TCP listener that accepts connections but never speaks the Redis
/// protocol, so clients hang waiting for a reply. Used to distinguish
/// deadline expiry from connection refusal.
pub async fn spawn_hanging_server() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            if let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        }
    });

    (addr, handle)
}
