//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use service_core::config::{DependencyConfig, ServiceConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A running mock dependency.
pub struct MockDependency {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
}

impl MockDependency {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests that reached the dependency.
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a programmable mock dependency on an ephemeral port.
///
/// `f` receives the request path and returns the status and JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockDependency
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let f = Arc::new(f);

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        let Some(path) = read_request_path(&mut socket).await else {
                            return;
                        };
                        counter.fetch_add(1, Ordering::SeqCst);

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockDependency { addr, hits }
}

/// Read the request head and return its path.
async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

/// An address nothing listens on.
pub async fn closed_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Success envelope around a user.
pub fn user_envelope(id: u64, status: &str) -> String {
    serde_json::json!({
        "success": true,
        "data": {
            "id": id,
            "email": format!("user{}@example.com", id),
            "name": "Ada",
            "age": 36,
            "status": status,
        }
    })
    .to_string()
}

/// Failure envelope.
pub fn error_envelope(code: &str, message: &str) -> String {
    serde_json::json!({
        "success": false,
        "error": { "code": code, "message": message }
    })
    .to_string()
}

/// Defaults pointed at `user_service`, with the cache and metrics left off.
pub fn config_for(user_service: &str) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.dependencies = vec![DependencyConfig {
        name: "user-service".into(),
        base_url: user_service.to_string(),
        request_timeout_secs: 2,
    }];
    config.cache.enabled = false;
    config.observability.metrics_enabled = false;
    config
}
