//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → probe.rs (bounded TCP connect, one task per backend)
//!     → Backend::set_alive
//!
//! Failed forwards (resilience::dispatch):
//!     Retry budget exhausted
//!     → BackendPool::mark_backend_status(address, false)
//! ```
//!
//! # Design Decisions
//! - Probes are independent; a slow backend never delays the others
//! - One probe result flips liveness, no hysteresis
//! - The checker never adds or removes backends

pub mod active;
pub mod probe;

pub use active::{HealthMonitor, HealthReport};
pub use probe::{Prober, TcpProber};
