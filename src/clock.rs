//! Injectable clock for polling and backoff.
//!
//! Extraction-job polling and invocation backoff are the only places the
//! pipeline waits. Both go through [`Clock`] so tests can simulate elapsed
//! time without real delays.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Time source and sleep dependency for the pipeline's wait loops.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by `Instant::now` and `tokio::time::sleep`.
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
