//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Backend server definitions, in registration order.
    pub backends: Vec<BackendConfig>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry and failover configuration.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3030").
    pub bind_address: String,

    /// Largest request body buffered for forwarding and retries.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3030".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend address as `host:port`.
    pub address: String,

    /// Declared maximum concurrent load.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl BackendConfig {
    pub fn new(address: impl Into<String>, capacity: usize) -> Self {
        Self {
            address: address.into(),
            capacity,
        }
    }
}

pub(crate) fn default_capacity() -> usize {
    10
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks.
    pub enabled: bool,

    /// Health check interval in seconds.
    pub interval_secs: u64,

    /// Per-probe connect timeout in milliseconds.
    pub timeout_ms: u64,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            timeout_ms: 1000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline, covering every retry and failover.
    pub request_secs: u64,

    /// Deadline for a single forward to one backend.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Backoff shape between same-backend retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Same-backend retries before the backend is marked dead.
    pub retry_limit: u32,

    /// Distinct backends tried for one request.
    pub attempts_limit: u32,

    /// Backoff shape.
    pub backoff: BackoffKind,

    /// Fixed delay, or the base delay for exponential backoff, in milliseconds.
    pub backoff_ms: u64,

    /// Upper bound for exponential backoff in milliseconds.
    pub max_backoff_ms: u64,

    /// Upstream statuses treated as a failed forward.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            attempts_limit: 3,
            backoff: BackoffKind::Fixed,
            backoff_ms: 10,
            max_backoff_ms: 1000,
            retry_on_status: vec![502, 503, 504],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [[backends]]
            address = "127.0.0.1:3001"
            "#,
        )
        .unwrap();

        assert_eq!(config.backends, vec![BackendConfig::new("127.0.0.1:3001", 10)]);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3030");
        assert_eq!(config.retries.retry_limit, 3);
        assert_eq!(config.retries.attempts_limit, 3);
        assert_eq!(config.retries.backoff, BackoffKind::Fixed);
        assert_eq!(config.health_check.timeout(), Duration::from_secs(1));
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_full_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8000"

            [[backends]]
            address = "10.0.0.1:80"
            capacity = 20

            [[backends]]
            address = "10.0.0.2:80"
            capacity = 5

            [health_check]
            interval_secs = 2
            timeout_ms = 250

            [retries]
            backoff = "exponential"
            backoff_ms = 50

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:8000");
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[0].capacity, 20);
        assert_eq!(config.health_check.interval(), Duration::from_secs(2));
        assert_eq!(config.retries.backoff, BackoffKind::Exponential);
        assert_eq!(config.retries.max_backoff_ms, 1000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
