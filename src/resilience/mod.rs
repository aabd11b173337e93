//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → dispatch.rs (select backend, forward in its own task)
//!     → On failure: retries.rs (retry same backend while budget remains)
//!     → backoff.rs (delay between retries)
//!     → Budget spent: mark backend dead, fail over to the next one
//! ```
//!
//! # Design Decisions
//! - Every request is bounded: retry_limit per backend, attempts_limit overall
//! - Per-backend failures never reach the caller, only exhaustion does
//! - Request state is an explicit struct, never shared between requests

pub mod backoff;
pub mod dispatch;
pub mod retries;

pub use backoff::Backoff;
pub use dispatch::{Dispatcher, ForwardError, Forwarder};
pub use retries::{RequestContext, RetryPolicy};
