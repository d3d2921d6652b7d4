//! Outbound request pacing for surf data providers.
//!
//! Every provider call, whether scheduled or triggered by a device cache
//! miss, takes a slot from the same bucket.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared request budget for provider calls.
#[derive(Debug, Clone)]
pub struct ProviderThrottle {
    limiter: Arc<DirectLimiter>,
}

impl ProviderThrottle {
    /// Allow `requests_per_minute` calls per minute. Zero is treated as one.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(rate))),
        }
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

impl Default for ProviderThrottle {
    fn default() -> Self {
        Self::per_minute(60)
    }
}
