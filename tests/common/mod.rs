//! Shared mock downstream for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use logistics_bff::config::{ClientConfig, ClientStrategy};

/// What the mock sends back for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: "error".to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A running mock downstream.
pub struct MockDownstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockDownstream {
    pub fn url(&self) -> String {
        format!("http://{}/api/logistics", self.addr)
    }

    /// Requests fully received so far.
    #[allow(dead_code)]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a mock that always sends the same reply.
#[allow(dead_code)]
pub async fn start_mock_downstream(reply: Reply) -> MockDownstream {
    start_programmable_downstream(move |_| {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Start a mock whose reply depends on the zero-based request index.
#[allow(dead_code)]
pub async fn start_programmable_downstream<F, Fut>(f: F) -> MockDownstream
where
    F: Fn(usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let counter = counter.clone();
                    tokio::spawn(async move {
                        serve_one(socket, f, counter).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockDownstream { addr, hits }
}

async fn serve_one<F, Fut>(mut socket: TcpStream, f: Arc<F>, hits: Arc<AtomicUsize>)
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Reply>,
{
    if !read_request_head(&mut socket).await {
        return;
    }
    let index = hits.fetch_add(1, Ordering::SeqCst);
    let reply = f(index).await;
    tokio::time::sleep(reply.delay).await;

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason(reply.status),
        reply.body.len(),
        reply.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Read until the blank line ending the request head. GETs carry no body.
async fn read_request_head(socket: &mut TcpStream) -> bool {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    return true;
                }
            }
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// A mock that keeps sockets open and answers every request on them.
#[allow(dead_code)]
pub struct KeepAliveDownstream {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl KeepAliveDownstream {
    pub fn url(&self) -> String {
        format!("http://{}/api/logistics", self.addr)
    }

    /// Connections accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Connections the client has closed so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Start a keep-alive mock that always answers 200 with `body`.
#[allow(dead_code)]
pub async fn start_keepalive_downstream(body: &str) -> KeepAliveDownstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );

    let (accepted_count, closed_count) = (accepted.clone(), closed.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            accepted_count.fetch_add(1, Ordering::SeqCst);
            let closed_count = closed_count.clone();
            let response = response.clone();
            tokio::spawn(async move {
                let mut pending = Vec::new();
                while read_next_request(&mut socket, &mut pending).await {
                    if socket.write_all(response.as_bytes()).await.is_err() {
                        break;
                    }
                }
                closed_count.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    KeepAliveDownstream {
        addr,
        accepted,
        closed,
    }
}

/// Consume one request head from `pending`, reading more as needed.
/// Returns false once the peer closes the socket.
#[allow(dead_code)]
async fn read_next_request(socket: &mut TcpStream, pending: &mut Vec<u8>) -> bool {
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(end) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
            pending.drain(..end + 4);
            return true;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => pending.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Client config pointed at `url` with test-friendly defaults.
pub fn client_config(url: &str) -> ClientConfig {
    ClientConfig {
        target_url: url.to_string(),
        connect_timeout_ms: 1_000,
        response_timeout_ms: 2_000,
        max_connections_total: 8,
        max_connections_per_route: 8,
        idle_eviction_interval_ms: 1_000,
        strategy: ClientStrategy::Pooled,
    }
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
