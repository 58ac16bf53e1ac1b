//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use edge_gateway::config::GatewayConfig;
use edge_gateway::feed::{ConfigSnapshot, MemorySource};
use edge_gateway::lifecycle::{start, GatewayHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock backend that answers every request with
/// `<backend name> <request line target>`.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                let target = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("?")
                    .to_string();
                let body = format!("{name} {target}");
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Backend: {name}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Start a mock backend that accepts connections but answers only after `delay`.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\nslow")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Backend that never answers and counts connections opened and closed.
pub struct HangingBackend {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl HangingBackend {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub async fn start_hanging_backend() -> HangingBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));

    let (accepted_in, closed_in) = (Arc::clone(&accepted), Arc::clone(&closed));
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            accepted_in.fetch_add(1, Ordering::SeqCst);
            let closed = Arc::clone(&closed_in);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                // Read until the peer hangs up.
                while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
                closed.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    HangingBackend {
        addr,
        accepted,
        closed,
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// JSON for a single path-prefix route.
pub fn route(id: &str, prefix: &str, target: SocketAddr) -> String {
    format!(
        r#"{{"id": "{id}", "predicates": ["Path={prefix}/**"], "uri": "http://{target}", "order": 0}}"#
    )
}

pub fn routes(entries: &[String]) -> String {
    format!("[{}]", entries.join(","))
}

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.feed.request_timeout_ms = 500;
    config.feed.reconnect_base_delay_ms = 10;
    config.feed.reconnect_max_delay_ms = 50;
    config.upstream.connect_timeout_secs = 1;
    config.upstream.request_timeout_secs = 1;
    config
}

/// Start a gateway fed by `source` and wait until `version` is active.
pub async fn start_gateway(
    config: &GatewayConfig,
    source: &MemorySource,
    version: u64,
) -> GatewayHandle {
    let handle = start(config, Arc::new(source.clone())).await.unwrap();
    wait_for_version(&handle, version).await;
    handle
}

pub async fn wait_for_version(handle: &GatewayHandle, version: u64) {
    wait_until(|| handle.registry().current().version() == Some(version)).await;
}

/// Poll `condition` for up to five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn snapshot(version: u64, content: String) -> ConfigSnapshot {
    ConfigSnapshot::new(version, content)
}

pub fn url(handle: &GatewayHandle, path: &str) -> String {
    format!("http://{}{}", handle.local_addr(), path)
}
