//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID, body limit)
//! - Spawn the health monitor alongside the server
//! - Hand every request to the dispatcher under the request deadline;
//!   map exhaustion and an expired deadline to 503

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::health::HealthMonitor;
use crate::http::forward::HttpForwarder;
use crate::http::request::{self, BufferedRequest};
use crate::http::response;
use crate::lifecycle::shutdown;
use crate::load_balancer::BackendPool;
use crate::observability::metrics;
use crate::resilience::{Dispatcher, RetryPolicy};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher<HttpForwarder>>,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<BackendPool>,
}

impl HttpServer {
    /// Create a server that balances over `pool`.
    pub fn new(config: ProxyConfig, pool: Arc<BackendPool>) -> Self {
        let forwarder = HttpForwarder::new(
            Duration::from_secs(config.timeouts.upstream_secs),
            &config.retries.retry_on_status,
        );
        let dispatcher = Dispatcher::new(
            pool.clone(),
            forwarder,
            RetryPolicy::from_config(&config.retries),
        );

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
            max_body_bytes: config.listener.max_body_bytes,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes)),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
        let monitor_shutdown = shutdown_rx.resubscribe();
        tokio::spawn(async move {
            monitor.run(monitor_shutdown).await;
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }
}

/// Run the request under the request deadline; an expired deadline gets the
/// same 503 as an exhausted pool.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let deadline = state.request_timeout;

    match time::timeout(deadline, proxy(state, request, start_time)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                method = %method,
                path = %path,
                timeout_secs = deadline.as_secs(),
                reason = "request_timeout",
                "Service unavailable"
            );
            metrics::record_unavailable("request_timeout");
            metrics::record_request(method.as_str(), 503, start_time);
            response::service_unavailable()
        }
    }
}

/// Buffer the request, dispatch it, and translate exhaustion into 503.
async fn proxy(state: AppState, request: Request<Body>, start_time: Instant) -> Response {
    let method = request.method().clone();

    let request = match BufferedRequest::from_request(request, state.max_body_bytes).await {
        Ok(request) => request,
        Err(e) if request::is_length_limit(&e) => {
            tracing::warn!(method = %method, error = %e, "Request body too large");
            metrics::record_request(method.as_str(), 413, start_time);
            return response::payload_too_large();
        }
        Err(e) => {
            tracing::warn!(method = %method, error = %e, "Failed to read request body");
            metrics::record_request(method.as_str(), 400, start_time);
            return response::bad_request();
        }
    };
    let request = Arc::new(request);

    match state.dispatcher.dispatch(request.clone()).await {
        Ok(upstream) => {
            metrics::record_request(method.as_str(), upstream.status().as_u16(), start_time);
            upstream
        }
        Err(err) => {
            tracing::warn!(
                request_id = %request.request_id(),
                method = %method,
                path = %request.uri.path(),
                reason = err.kind(),
                error = %err,
                "Service unavailable"
            );
            metrics::record_unavailable(err.kind());
            metrics::record_request(method.as_str(), 503, start_time);
            response::service_unavailable()
        }
    }
}
