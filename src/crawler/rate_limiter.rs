//! Minimum-interval rate limiting for outbound requests
//!
//! Every page and detail fetch (retries included) takes a turn from a
//! limiter before touching the network. The wait happens while the limiter's
//! lock is held, so concurrent callers queue up and successive grants are
//! spaced at least `min_interval` apart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive request grants
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
    turns: AtomicU64,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_grant: Mutex::new(None),
            turns: AtomicU64::new(0),
        }
    }

    /// Waits until a request may be sent, then records the grant
    ///
    /// The first call returns immediately.
    pub async fn await_turn(&self) {
        let mut last_grant = self.last_grant.lock().await;

        if let Some(last) = *last_grant {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::trace!("Rate limiter waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }

        *last_grant = Some(Instant::now());
        self.turns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of turns granted so far
    pub fn turns(&self) -> u64 {
        self.turns.load(Ordering::Relaxed)
    }
}
