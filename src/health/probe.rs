//! Reachability probes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time;

/// Answers whether a backend address is reachable within a timeout.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    async fn probe(&self, address: &str, timeout: Duration) -> bool;
}

/// Probes by opening (and immediately dropping) a TCP connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &str, timeout: Duration) -> bool {
        match time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                tracing::debug!(address = %address, error = %e, "Probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(address = %address, "Probe failed: timeout");
                false
            }
        }
    }
}
