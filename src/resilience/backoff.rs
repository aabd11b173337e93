//! Delay between same-backend retries.

use std::time::Duration;

use rand::Rng;

use crate::config::schema::{BackoffKind, RetryConfig};

/// How long to wait before retry number `retry` (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed(Duration::from_millis(config.backoff_ms)),
            BackoffKind::Exponential => Backoff::Exponential {
                base: Duration::from_millis(config.backoff_ms),
                max: Duration::from_millis(config.max_backoff_ms),
            },
        }
    }

    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                calculate_backoff(retry, base.as_millis() as u64, max.as_millis() as u64)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(Duration::from_millis(10))
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter of up to 10% of the delay
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
