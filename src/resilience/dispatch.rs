//! Request dispatch with retry and failover.
//!
//! # State Machine (per request)
//! ```text
//! DISPATCHING → success → DONE
//! DISPATCHING → failure, retries left → RETRY_WAIT → DISPATCHING (same backend)
//! DISPATCHING → failure, retries spent → FAILOVER → DISPATCHING (next backend)
//! any → no alive backend / attempts spent → UNAVAILABLE
//! ```
//!
//! Dropping the future returned by [`Dispatcher::dispatch`] abandons all
//! pending retries. A forward that already started keeps running in its own
//! task until it finishes, and its result is discarded.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time;

use crate::error::BalancerError;
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;
use crate::resilience::retries::{RequestContext, RetryPolicy};

/// Failure reported by a [`Forwarder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("timed out")]
    Timeout,
    #[error("backend answered {0}")]
    Status(u16),
    #[error("forward task aborted: {0}")]
    Aborted(String),
}

/// Sends one request to one backend.
#[async_trait]
pub trait Forwarder: Send + Sync + 'static {
    type Request: Send + Sync + 'static;
    type Response: Send + 'static;

    async fn forward(
        &self,
        backend: &Backend,
        request: &Self::Request,
    ) -> Result<Self::Response, ForwardError>;
}

/// Retry/failover controller over a shared pool.
pub struct Dispatcher<F> {
    pool: Arc<BackendPool>,
    forwarder: Arc<F>,
    policy: RetryPolicy,
}

impl<F: Forwarder> Dispatcher<F> {
    pub fn new(pool: Arc<BackendPool>, forwarder: F, policy: RetryPolicy) -> Self {
        Self {
            pool,
            forwarder: Arc::new(forwarder),
            policy,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Serve `request` from the best alive backend, retrying and failing
    /// over as needed. Errors are always [`BalancerError::PoolExhausted`] or
    /// [`BalancerError::AttemptBudgetExceeded`].
    pub async fn dispatch(&self, request: Arc<F::Request>) -> Result<F::Response, BalancerError> {
        let mut ctx = RequestContext::new();

        loop {
            if ctx.attempts_exhausted(&self.policy) {
                let attempts = ctx.attempts - 1;
                tracing::warn!(attempts, "Attempt budget exhausted");
                return Err(BalancerError::AttemptBudgetExceeded { attempts });
            }

            let Some(backend) = self.pool.get_next_backend() else {
                tracing::warn!(attempts = ctx.attempts, "No alive backend");
                return Err(BalancerError::PoolExhausted);
            };

            match self.serve(&backend, &request, &mut ctx).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::warn!(
                        address = %backend.address(),
                        attempts = ctx.attempts,
                        retries = ctx.retries,
                        error = %err,
                        "Failing over"
                    );
                    self.pool.mark_backend_status(backend.address(), false);
                    metrics::record_failover(backend.address());
                    ctx.fail_over();
                }
            }
        }
    }

    /// Forward to one backend until success or the retry budget is spent.
    async fn serve(
        &self,
        backend: &Arc<Backend>,
        request: &Arc<F::Request>,
        ctx: &mut RequestContext,
    ) -> Result<F::Response, BalancerError> {
        loop {
            let error = match self.forward_once(backend, request).await {
                Ok(response) => return Ok(response),
                Err(e) => BalancerError::BackendUnreachable {
                    address: backend.address().to_string(),
                    reason: e.to_string(),
                },
            };

            if !ctx.can_retry(&self.policy) {
                return Err(BalancerError::RetryBudgetExceeded {
                    address: backend.address().to_string(),
                    retries: ctx.retries,
                });
            }

            ctx.record_retry();
            let delay = self.policy.backoff.delay(ctx.retries);
            tracing::info!(
                address = %backend.address(),
                attempts = ctx.attempts,
                retries = ctx.retries,
                delay = ?delay,
                error = %error,
                "Retrying backend"
            );
            metrics::record_retry(backend.address());
            time::sleep(delay).await;
        }
    }

    async fn forward_once(
        &self,
        backend: &Arc<Backend>,
        request: &Arc<F::Request>,
    ) -> Result<F::Response, ForwardError> {
        let forwarder = self.forwarder.clone();
        let request = request.clone();
        let flow = backend.track_flow();

        let task = tokio::spawn(async move {
            let result = forwarder.forward(&flow, &request).await;
            drop(flow);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(ForwardError::Aborted(e.to_string())),
        }
    }
}
