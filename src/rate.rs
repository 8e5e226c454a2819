//! Fixed-interval rate limiting for oracle calls.
//!
//! An explicit value passed into the engine rather than an inline sleep, so
//! tests run without wall-clock delays. The pause happens after every oracle
//! call, including the ones inside the retry-by-halving path.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    delay: Option<Duration>,
}

impl RateLimiter {
    pub fn from_rpm(requests_per_minute: u32) -> Self {
        let delay = if requests_per_minute == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(60.0 / requests_per_minute as f64))
        };
        Self { delay }
    }

    /// No pauses at all. Tests use this.
    pub fn disabled() -> Self {
        Self { delay: None }
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Sleep out the configured inter-call interval.
    pub async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }
}
