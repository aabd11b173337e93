//! Retry and failover limits.
//!
//! A failed forward is retried against the same backend up to
//! `retry_limit` times; after that the backend is presumed down and the
//! request fails over. At most `attempts_limit` distinct backends are tried,
//! so one request costs at most `attempts_limit * (retry_limit + 1)`
//! forwards.

use crate::config::RetryConfig;
use crate::resilience::backoff::Backoff;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retry_limit: u32,
    pub attempts_limit: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            retry_limit: config.retry_limit,
            attempts_limit: config.attempts_limit,
            backoff: Backoff::from_config(config),
        }
    }

    /// Upper bound on forwards for one request.
    pub fn max_forwards(&self) -> u32 {
        self.attempts_limit.saturating_mul(self.retry_limit.saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Per-request retry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    /// Distinct backends tried, starting at 1.
    pub attempts: u32,
    /// Retries against the current backend, starting at 0.
    pub retries: u32,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            attempts: 1,
            retries: 0,
        }
    }

    pub fn can_retry(&self, policy: &RetryPolicy) -> bool {
        self.retries < policy.retry_limit
    }

    pub fn attempts_exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempts > policy.attempts_limit
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    /// Move on to a new backend.
    pub fn fail_over(&mut self) {
        self.attempts += 1;
        self.retries = 0;
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_transitions() {
        let policy = RetryPolicy::default();
        let mut ctx = RequestContext::new();
        assert_eq!(ctx, RequestContext { attempts: 1, retries: 0 });

        for _ in 0..3 {
            assert!(ctx.can_retry(&policy));
            ctx.record_retry();
        }
        assert!(!ctx.can_retry(&policy));

        ctx.fail_over();
        assert_eq!(ctx, RequestContext { attempts: 2, retries: 0 });
        assert!(!ctx.attempts_exhausted(&policy));

        ctx.fail_over();
        ctx.fail_over();
        assert!(ctx.attempts_exhausted(&policy));
    }

    #[test]
    fn test_max_forwards() {
        assert_eq!(RetryPolicy::default().max_forwards(), 12);
    }
}
