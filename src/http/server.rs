//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the goods-detail handler
//! - Wire up middleware (request ID, tracing)
//! - Call the downstream client and compose the response
//! - Drain in-flight requests on shutdown

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::BffConfig;
use crate::downstream::{DownstreamClient, PoolStats};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{goods_detail_body, DownstreamFailure};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<DownstreamClient>,
    pub shutdown: Shutdown,
}

/// HTTP server for the BFF.
pub struct HttpServer {
    router: Router,
    config: BffConfig,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around an already-built client.
    pub fn new(config: BffConfig, client: Arc<DownstreamClient>, shutdown: Shutdown) -> Self {
        let state = AppState {
            client,
            shutdown: shutdown.clone(),
        };
        let router = Self::build_router(state);
        Self {
            router,
            config,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/goods-detail", get(goods_detail_handler))
            .route("/api/pool-stats", get(pool_stats_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                                request_id = %request_id(request),
                            )
                        },
                    ))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server until the shutdown coordinator fires.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target_url = %self.config.downstream.target_url,
            strategy = ?self.config.downstream.strategy,
            "HTTP server starting"
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move { shutdown.triggered().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fetch logistics and prepend the goods detail.
///
/// In-flight calls are interrupted when shutdown begins so draining is quick.
async fn goods_detail_handler(State(state): State<AppState>) -> Response {
    let cancel = state.shutdown.token();
    let response = match state.client.fetch_logistics_until(&cancel).await {
        Ok(body) => (StatusCode::OK, goods_detail_body(&body)).into_response(),
        Err(e) => {
            tracing::warn!(kind = %e.kind(), error = %e.message(), "Downstream call failed");
            DownstreamFailure(e).into_response()
        }
    };
    metrics::record_response(response.status().as_u16());
    response
}

async fn pool_stats_handler(State(state): State<AppState>) -> Json<PoolStats> {
    Json(state.client.pool_stats())
}
