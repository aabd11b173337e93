//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject malformed and duplicate backend addresses
//! - Validate value ranges (capacities, intervals, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,
    #[error("malformed backend address {address:?}: {reason}")]
    MalformedAddress { address: String, reason: String },
    #[error("duplicate backend address {0}")]
    DuplicateAddress(String),
    #[error("backend {0} has zero capacity")]
    ZeroCapacity(String),
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
    #[error("health check interval must be > 0")]
    ZeroInterval,
    #[error("{0} timeout must be > 0")]
    ZeroTimeout(&'static str),
    #[error("retries.attempts_limit must be > 0")]
    ZeroAttemptsLimit,
}

/// Parse a backend address into a `host:port` authority.
pub fn parse_backend_address(address: &str) -> Result<Authority, ValidationError> {
    let malformed = |reason: &str| ValidationError::MalformedAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let authority = Authority::from_str(address).map_err(|e| malformed(&e.to_string()))?;
    if authority.as_str().contains('@') {
        return Err(malformed("userinfo is not allowed"));
    }
    if authority.host().is_empty() {
        return Err(malformed("missing host"));
    }
    if authority.port_u16().is_none() {
        return Err(malformed("missing port"));
    }
    Ok(authority)
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends {
        match parse_backend_address(&backend.address) {
            Ok(authority) => {
                if !seen.insert(authority.as_str().to_ascii_lowercase()) {
                    errors.push(ValidationError::DuplicateAddress(backend.address.clone()));
                }
            }
            Err(e) => errors.push(e),
        }
        if backend.capacity == 0 {
            errors.push(ValidationError::ZeroCapacity(backend.address.clone()));
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::ZeroInterval);
        }
        if config.health_check.timeout_ms == 0 {
            errors.push(ValidationError::ZeroTimeout("health_check"));
        }
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream"));
    }
    if config.retries.attempts_limit == 0 {
        errors.push(ValidationError::ZeroAttemptsLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
