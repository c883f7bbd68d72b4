//! End-to-end tests for the BFF HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use logistics_bff::config::{BffConfig, ClientConfig};
use logistics_bff::{DownstreamClient, HttpServer, Shutdown};

mod common;
use common::{client_config, start_mock_downstream, Reply};

struct RunningBff {
    addr: SocketAddr,
    shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningBff {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

async fn start_bff(downstream: ClientConfig) -> RunningBff {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = BffConfig::default();
    config.listener.bind_address = addr.to_string();
    config.downstream = downstream;

    let client = Arc::new(DownstreamClient::new(config.downstream.clone()).unwrap());
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, client, shutdown.clone());
    let server = tokio::spawn(server.run(listener));

    RunningBff {
        addr,
        shutdown,
        server,
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn goods_detail_composes_downstream_body() {
    let downstream = start_mock_downstream(Reply::ok("ok")).await;
    let bff = start_bff(client_config(&downstream.url())).await;

    let res = http_client()
        .get(bff.url("/api/goods-detail"))
        .send()
        .await
        .expect("BFF unreachable");

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "商品详情 + ok");

    bff.shutdown.trigger();
}

#[tokio::test]
async fn caller_request_id_is_echoed() {
    let downstream = start_mock_downstream(Reply::ok("ok")).await;
    let bff = start_bff(client_config(&downstream.url())).await;

    let res = http_client()
        .get(bff.url("/api/goods-detail"))
        .header("x-request-id", "order-42")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "order-42");
    bff.shutdown.trigger();
}

#[tokio::test]
async fn downstream_error_status_becomes_bad_gateway() {
    let downstream = start_mock_downstream(Reply::status(503)).await;
    let bff = start_bff(client_config(&downstream.url())).await;

    let res = http_client()
        .get(bff.url("/api/goods-detail"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    assert!(res.text().await.unwrap().contains("downstream returned status 503"));
    bff.shutdown.trigger();
}

#[tokio::test]
async fn slow_downstream_becomes_gateway_timeout() {
    let downstream =
        start_mock_downstream(Reply::ok("late").delayed(Duration::from_secs(2))).await;
    let mut config = client_config(&downstream.url());
    config.response_timeout_ms = 200;
    let bff = start_bff(config).await;

    let res = http_client()
        .get(bff.url("/api/goods-detail"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    bff.shutdown.trigger();
}

#[tokio::test]
async fn pool_stats_are_exposed_as_json() {
    let downstream = start_mock_downstream(Reply::ok("ok")).await;
    let mut config = client_config(&downstream.url());
    config.max_connections_total = 16;
    config.max_connections_per_route = 4;
    let bff = start_bff(config).await;

    let client = http_client();
    client
        .get(bff.url("/api/goods-detail"))
        .send()
        .await
        .unwrap();

    let stats: serde_json::Value = client
        .get(bff.url("/api/pool-stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["in_flight"], 0);
    assert_eq!(stats["max_total"], 16);
    assert_eq!(stats["max_per_route"], 4);
    bff.shutdown.trigger();
}

#[tokio::test]
async fn shutdown_interrupts_in_flight_calls_and_stops_server() {
    let downstream =
        start_mock_downstream(Reply::ok("late").delayed(Duration::from_secs(5))).await;
    let mut config = client_config(&downstream.url());
    config.response_timeout_ms = 10_000;
    let bff = start_bff(config).await;

    let url = bff.url("/api/goods-detail");
    let pending = tokio::spawn(async move { http_client().get(url).send().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    bff.shutdown.trigger();

    let res = tokio::time::timeout(Duration::from_secs(2), pending)
        .await
        .expect("in-flight request should finish promptly")
        .unwrap()
        .unwrap();
    assert_eq!(res.status(), 503);

    tokio::time::timeout(Duration::from_secs(2), bff.server)
        .await
        .expect("server should stop after draining")
        .unwrap()
        .unwrap();
}
