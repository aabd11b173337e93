//! Backend pool management.
//!
//! # Responsibilities
//! - Keep backends roughly ordered by free capacity, most free first
//! - Select the first alive backend and repair the order locally
//! - Flip liveness by address for failover and health checks
//!
//! Ordering is a soft invariant. Selection never takes the exclusive
//! membership guard; `tidy` only runs when it can take it without waiting,
//! so a skipped repair is picked up by a later selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{BackendConfig, ConfigError};
use crate::config::validation::parse_backend_address;
use crate::load_balancer::backend::Backend;

/// Errors from pool membership changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("backend {address} is already registered")]
    Duplicate { address: String },
}

/// Ordered set of backends with capacity-aware selection.
#[derive(Debug, Default)]
pub struct BackendPool {
    members: RwLock<Vec<Arc<Backend>>>,
    /// Index of the last backend selected past the head of the list.
    cursor: AtomicUsize,
}

impl BackendPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from configuration, failing on malformed or duplicate
    /// addresses.
    pub fn from_config(configs: &[BackendConfig]) -> Result<Self, ConfigError> {
        let pool = Self::new();
        let mut errors = Vec::new();

        for config in configs {
            let authority = match parse_backend_address(&config.address) {
                Ok(authority) => authority,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let backend = Arc::new(Backend::new(authority, config.capacity));
            if let Err(PoolError::Duplicate { address }) = pool.add_backend(backend) {
                errors.push(crate::config::validation::ValidationError::DuplicateAddress(address));
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        for backend in pool.backends() {
            tracing::info!(
                address = %backend.address(),
                capacity = backend.capacity(),
                "Backend registered"
            );
        }
        Ok(pool)
    }

    /// Register a backend and place it by capacity with one pass of
    /// adjacent swaps toward the front.
    pub fn add_backend(&self, backend: Arc<Backend>) -> Result<(), PoolError> {
        let mut members = self.members.write();
        if members
            .iter()
            .any(|b| b.address().eq_ignore_ascii_case(backend.address()))
        {
            return Err(PoolError::Duplicate {
                address: backend.address().to_string(),
            });
        }

        members.push(backend);
        let mut idx = members.len() - 1;
        while idx > 0 && members[idx].capacity() > members[idx - 1].capacity() {
            members.swap(idx, idx - 1);
            idx -= 1;
        }
        Ok(())
    }

    /// Remove a backend by address. In-flight holders of the returned
    /// handle keep it alive until they finish.
    pub fn remove_backend(&self, address: &str) -> Option<Arc<Backend>> {
        let mut members = self.members.write();
        let idx = members
            .iter()
            .position(|b| b.address().eq_ignore_ascii_case(address))?;
        Some(members.remove(idx))
    }

    /// Advance the rotation cursor and return it modulo the pool size.
    /// Returns 0 for an empty pool.
    pub fn next_index(&self) -> usize {
        let len = self.len();
        let next = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if len == 0 {
            0
        } else {
            next % len
        }
    }

    /// Current value of the rotation cursor.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Set the liveness of the backend at `address`. Unknown addresses are
    /// ignored; returns whether a backend matched.
    pub fn mark_backend_status(&self, address: &str, alive: bool) -> bool {
        let members = self.members.read();
        match members
            .iter()
            .find(|b| b.address().eq_ignore_ascii_case(address))
        {
            Some(backend) => {
                if backend.set_alive(alive) {
                    tracing::info!(address = %address, alive, "Backend status changed");
                }
                true
            }
            None => {
                tracing::debug!(address = %address, "Status update for unknown backend ignored");
                false
            }
        }
    }

    /// Select the alive backend with the most free capacity.
    ///
    /// Scans from the head of the list, which holds the most free capacity,
    /// and returns the first alive member. Returns `None` when no member is
    /// alive.
    pub fn get_next_backend(&self) -> Option<Arc<Backend>> {
        let (index, backend) = {
            let members = self.members.read();
            members
                .iter()
                .enumerate()
                .find(|(_, b)| b.is_alive())
                .map(|(i, b)| (i, b.clone()))?
        };

        if index != 0 {
            self.cursor.store(index, Ordering::Relaxed);
        }
        self.tidy(index);
        Some(backend)
    }

    /// Move the backend at `idx` toward the tail while its neighbour has
    /// more free capacity. Stops at the tail or once order holds.
    pub fn tidy(&self, mut idx: usize) {
        let Some(mut members) = self.members.try_write() else {
            tracing::trace!(index = idx, "Pool busy, tidy skipped");
            return;
        };

        while idx + 1 < members.len() && members[idx].free() < members[idx + 1].free() {
            members.swap(idx, idx + 1);
            idx += 1;
        }
    }

    pub fn find(&self, address: &str) -> Option<Arc<Backend>> {
        self.members
            .read()
            .iter()
            .find(|b| b.address().eq_ignore_ascii_case(address))
            .cloned()
    }

    /// Snapshot of all members in current order.
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.members.read().clone()
    }

    pub fn alive_count(&self) -> usize {
        self.members.read().iter().filter(|b| b.is_alive()).count()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}
