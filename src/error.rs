//! Error taxonomy for the balancer core.
//!
//! Per-backend failures never reach a caller directly: they are absorbed
//! into liveness changes or retry/failover decisions. Only pool-wide
//! exhaustion and budget exhaustion surface, and both map to the same
//! "service unavailable" response.

use crate::config::loader::ConfigError;

/// Errors produced by the balancer core.
#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    /// A probe or forward could not reach the backend.
    #[error("backend {address} unreachable: {reason}")]
    BackendUnreachable { address: String, reason: String },

    /// No alive backend exists at selection time.
    #[error("no alive backend in pool")]
    PoolExhausted,

    /// Same-backend retry ceiling hit; triggers failover.
    #[error("retry budget exhausted for backend {address} after {retries} retries")]
    RetryBudgetExceeded { address: String, retries: u32 },

    /// Cross-backend attempt ceiling hit.
    #[error("attempt budget exhausted after {attempts} attempts")]
    AttemptBudgetExceeded { attempts: u32 },

    /// Duplicate or malformed backend configuration.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl BalancerError {
    /// True for the variants a caller sees as "service unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            BalancerError::PoolExhausted | BalancerError::AttemptBudgetExceeded { .. }
        )
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BalancerError::BackendUnreachable { .. } => "backend_unreachable",
            BalancerError::PoolExhausted => "pool_exhausted",
            BalancerError::RetryBudgetExceeded { .. } => "retry_budget_exceeded",
            BalancerError::AttemptBudgetExceeded { .. } => "attempt_budget_exceeded",
            BalancerError::Configuration(_) => "configuration",
        }
    }
}
