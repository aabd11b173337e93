//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pool, health monitor and dispatcher produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Every liveness transition and failover carries the backend address
//! - Request ID flows through the HTTP layer as `x-request-id`
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
