//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track in-flight flow against declared capacity
//! - Track liveness as last observed by probes or failed forwards

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use axum::http::uri::Authority;
use parking_lot::Mutex;

/// Mutable part of a backend, always read and written as a unit.
#[derive(Debug)]
struct BackendState {
    alive: bool,
    flow: usize,
}

/// A single backend server.
pub struct Backend {
    authority: Authority,
    capacity: usize,
    state: Mutex<BackendState>,
}

impl Backend {
    /// Create a new backend. Backends start alive so traffic can flow
    /// before the first health probe completes.
    pub fn new(authority: Authority, capacity: usize) -> Self {
        Self {
            authority,
            capacity,
            state: Mutex::new(BackendState {
                alive: true,
                flow: 0,
            }),
        }
    }

    /// The `host:port` this backend listens on.
    pub fn address(&self) -> &str {
        self.authority.as_str()
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set the liveness flag. Returns true if the flag changed.
    pub fn set_alive(&self, alive: bool) -> bool {
        let mut state = self.state.lock();
        let changed = state.alive != alive;
        state.alive = alive;
        changed
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    /// Number of requests currently being forwarded to this backend.
    pub fn flow(&self) -> usize {
        self.state.lock().flow
    }

    /// Free capacity, `capacity - flow`. Negative when the backend is
    /// carrying more than it declared.
    pub fn free(&self) -> i64 {
        let state = self.state.lock();
        self.capacity as i64 - state.flow as i64
    }

    /// Count one in-flight request until the returned guard is dropped.
    pub fn track_flow(self: &Arc<Self>) -> FlowGuard {
        self.state.lock().flow += 1;
        FlowGuard {
            backend: self.clone(),
        }
    }

    fn release_flow(&self) {
        let mut state = self.state.lock();
        state.flow = state.flow.saturating_sub(1);
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Backend")
            .field("address", &self.address())
            .field("capacity", &self.capacity)
            .field("alive", &state.alive)
            .field("flow", &state.flow)
            .finish()
    }
}

/// A RAII guard that holds one unit of a backend's flow.
#[derive(Debug)]
pub struct FlowGuard {
    backend: Arc<Backend>,
}

impl Deref for FlowGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        self.backend.release_flow();
    }
}
