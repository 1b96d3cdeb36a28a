//! Politeness throttle owned by one fetcher.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::config::PolitenessConfig;

/// Enforces a minimum gap between requests and provides the fixed
/// courtesy pause taken between audit phases.
///
/// Each fetcher owns its own throttle, so concurrent audits of different
/// sites never wait on each other.
#[derive(Debug)]
pub struct Throttle {
    min_gap: Duration,
    pause: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_gap: Duration, pause: Duration) -> Self {
        Self {
            min_gap,
            pause,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_config(config: &PolitenessConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_gap_ms),
            Duration::from_millis(config.pause_ms),
        )
    }

    /// No gap, no pause.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Wait until the minimum gap since the previous request has passed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_gap {
                sleep(self.min_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Fixed pause between audit phases.
    pub async fn courtesy_pause(&self) {
        if !self.pause.is_zero() {
            debug!(pause_ms = self.pause.as_millis() as u64, "Politeness pause");
            sleep(self.pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let throttle = Throttle::new(Duration::from_secs(5), Duration::ZERO);
        let t0 = std::time::Instant::now();
        throttle.acquire().await;
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_min_gap_enforced() {
        let throttle = Throttle::new(Duration::from_millis(50), Duration::ZERO);
        let t0 = std::time::Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(t0.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_courtesy_pause() {
        let throttle = Throttle::new(Duration::ZERO, Duration::from_millis(20));
        let t0 = std::time::Instant::now();
        throttle.courtesy_pause().await;
        assert!(t0.elapsed() >= Duration::from_millis(20));

        let t1 = std::time::Instant::now();
        Throttle::disabled().courtesy_pause().await;
        assert!(t1.elapsed() < Duration::from_millis(20));
    }
}
