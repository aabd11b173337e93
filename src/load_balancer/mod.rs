//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request dispatch
//!     → pool.rs (first alive backend, most free capacity first)
//!     → pool.rs tidy (local re-ordering behind the selection)
//!     → backend.rs (flow guard held while forwarding)
//! ```
//!
//! # Design Decisions
//! - Greedy least-loaded selection with a liveness filter, not round robin
//! - Per-backend locks for liveness and flow; a separate pool-level guard
//!   for member order
//! - Dead backends excluded from selection until marked alive again

pub mod backend;
pub mod pool;

pub use backend::{Backend, FlowGuard};
pub use pool::{BackendPool, PoolError};
