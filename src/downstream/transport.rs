//! Connection strategies behind the downstream client.
//!
//! Both strategies issue the same HTTP/1.1 GET and report the same
//! `(status, body)` pair; they differ only in how sockets are obtained.

use http_body_util::{BodyExt, Empty};
use http::header::HOST;
use http::{Request, StatusCode, Uri};
use hyper::body::Bytes;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo, TokioTimer},
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use url::{Host, Url};

use crate::config::{ClientConfig, ClientStrategy};
use crate::downstream::error::FetchError;

/// Status and raw body of a completed exchange.
pub(crate) type Exchange = (StatusCode, Bytes);

/// Deadlines for one call, computed once a pool slot is held.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadlines {
    /// Hard stop for the whole call.
    pub overall: Instant,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl Deadlines {
    fn cap(&self, at: Instant) -> Instant {
        at.min(self.overall)
    }
}

/// Strategy selected at construction.
pub(crate) enum Transport {
    Pooled(PooledTransport),
    Unpooled(UnpooledTransport),
}

impl Transport {
    pub(crate) fn new(config: &ClientConfig, target: &Url) -> Self {
        match config.strategy {
            ClientStrategy::Pooled => Transport::Pooled(PooledTransport::new(config)),
            ClientStrategy::Unpooled => Transport::Unpooled(UnpooledTransport::new(target)),
        }
    }

    pub(crate) async fn get(&self, target: &Uri, deadlines: Deadlines) -> Result<Exchange, FetchError> {
        match self {
            Transport::Pooled(pooled) => pooled.get(target, deadlines).await,
            Transport::Unpooled(unpooled) => unpooled.get(target, deadlines).await,
        }
    }
}

/// Keep-alive pool shared by every call.
///
/// Idle sockets are evicted by hyper's pool on `idle_eviction_interval`;
/// `HttpConnector` enforces the connect timeout.
pub(crate) struct PooledTransport {
    client: Client<HttpConnector, Empty<Bytes>>,
}

impl PooledTransport {
    fn new(config: &ClientConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.idle_eviction_interval())
            .pool_max_idle_per_host(config.max_connections_per_route)
            .pool_timer(TokioTimer::new())
            .build(connector);

        Self { client }
    }

    async fn get(&self, target: &Uri, deadlines: Deadlines) -> Result<Exchange, FetchError> {
        let request = Request::get(target.clone()).body(Empty::<Bytes>::new())?;
        let respond_by = deadlines.cap(Instant::now() + deadlines.response_timeout);

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let body = response.into_body().collect().await?.to_bytes();
            Ok::<_, FetchError>((status, body))
        };

        match time::timeout_at(respond_by, exchange).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(deadlines.response_timeout)),
        }
    }
}

/// A dedicated connection per call, closed once the response is read.
pub(crate) struct UnpooledTransport {
    host: String,
    port: u16,
    authority: String,
}

impl UnpooledTransport {
    fn new(target: &Url) -> Self {
        let host = match target.host() {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        };
        let port = target.port_or_known_default().unwrap_or(80);
        let authority = match target.port() {
            Some(port) => format!("{}:{}", target.host_str().unwrap_or_default(), port),
            None => target.host_str().unwrap_or_default().to_string(),
        };
        Self {
            host,
            port,
            authority,
        }
    }

    async fn get(&self, target: &Uri, deadlines: Deadlines) -> Result<Exchange, FetchError> {
        let connect_by = deadlines.cap(Instant::now() + deadlines.connect_timeout);
        let stream = match time::timeout_at(
            connect_by,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(FetchError::connect(e)),
            Err(_) => return Err(FetchError::connect_timeout(deadlines.connect_timeout)),
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::trace!(error = %e, "Failed to set TCP_NODELAY");
        }
        tracing::trace!(host = %self.host, port = self.port, "Dedicated connection established");

        let path = target
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/");
        let request = Request::get(path)
            .header(HOST, self.authority.as_str())
            .body(Empty::<Bytes>::new())?;

        let respond_by = deadlines.cap(Instant::now() + deadlines.response_timeout);
        match time::timeout_at(respond_by, exchange(stream, request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout(deadlines.response_timeout)),
        }
    }
}

/// Run one request over a fresh HTTP/1.1 connection.
///
/// The connection is driven inline rather than spawned, so dropping this
/// future closes the socket.
async fn exchange(stream: TcpStream, request: Request<Empty<Bytes>>) -> Result<Exchange, FetchError> {
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::pin!(conn);

    let response = async {
        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        Ok::<_, FetchError>((status, body))
    };
    tokio::pin!(response);

    tokio::select! {
        biased;
        result = &mut response => result,
        closed = &mut conn => {
            if let Err(e) = closed {
                tracing::trace!(error = %e, "Dedicated connection closed with error");
            }
            // Whatever the dispatcher delivered before closing is still readable.
            response.await
        }
    }
}
