//! Shared utilities for integration tests: programmable mock beacon nodes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rocketwatch_beacon::beacon::HttpTransport;
use rocketwatch_beacon::config::ResilienceConfig;
use rocketwatch_beacon::BeaconClient;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

pub const HEAD_BLOCK: &str = r#"{"version":"deneb","execution_optimistic":false,"finalized":false,"data":{"message":{"slot":"9100000","proposer_index":"4242","parent_root":"0xcf8e0d4e9587369b2301d0790347320302cc0943d5a1884560367e8208d920f2","state_root":"0x4d611d5b93fdab69013a7f0a2f961caca0c853f87cfe9595fe50038163079360","body":{"execution_payload":{"block_number":"19900000"}}},"signature":"0x00"}}"#;

/// A mock beacon node with a call counter.
pub struct MockNode {
    pub addr: SocketAddr,
    pub calls: Arc<AtomicU32>,
}

impl MockNode {
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Start a mock node on an ephemeral port; `f` decides each response.
pub async fn start_programmable_node<F, Fut>(f: F) -> MockNode
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let f = Arc::new(f);

    let counter = calls.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let f = f.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = f().await;
                respond(socket, status, &body).await;
            });
        }
    });

    MockNode { addr, calls }
}

/// Start a mock node that always answers with the same status and body.
pub async fn start_fixed_node(status: u16, body: &'static str) -> MockNode {
    start_programmable_node(move || async move { (status, body.to_string()) }).await
}

/// An address nothing listens on.
pub async fn dead_endpoint() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

/// Client over real HTTP, bypassing any system proxy.
pub fn client(endpoints: &[Url], resilience: &ResilienceConfig) -> BeaconClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    BeaconClient::with_transport(endpoints, resilience, Arc::new(HttpTransport::from_client(http)))
        .unwrap()
}

pub fn fast_resilience() -> ResilienceConfig {
    ResilienceConfig {
        base_delay_ms: 0,
        ..ResilienceConfig::default()
    }
}

async fn respond(mut socket: TcpStream, status: u16, body: &str) {
    // Drain the request head so closing the socket does not reset the connection.
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
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
}
