//! Forwarding buffered requests to a backend over HTTP.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::http::request::BufferedRequest;
use crate::load_balancer::Backend;
use crate::resilience::{ForwardError, Forwarder};

/// Hyper client forwarder. Statuses listed in `retry_on_status` count as a
/// failed forward; everything else is passed back to the caller.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    retry_on_status: Arc<[u16]>,
}

impl HttpForwarder {
    pub fn new(timeout: Duration, retry_on_status: &[u16]) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            timeout,
            retry_on_status: retry_on_status.into(),
        }
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    type Request = BufferedRequest;
    type Response = Response<Body>;

    async fn forward(
        &self,
        backend: &Backend,
        request: &BufferedRequest,
    ) -> Result<Response<Body>, ForwardError> {
        let upstream = request
            .to_upstream(backend.authority())
            .map_err(|e| ForwardError::Connect(e.to_string()))?;

        tracing::debug!(
            request_id = %request.request_id(),
            address = %backend.address(),
            method = %request.method,
            path = %request.uri.path(),
            "Forwarding request"
        );

        let pending = self.client.request(upstream);
        let response: Response<Incoming> = match time::timeout(self.timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ForwardError::Connect(e.to_string())),
            Err(_) => return Err(ForwardError::Timeout),
        };

        let status = response.status();
        if self.retry_on_status.contains(&status.as_u16()) {
            return Err(ForwardError::Status(status.as_u16()));
        }

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
