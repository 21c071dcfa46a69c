use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;
use std::num::NonZeroU32;

type DirectLimiter = governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Process-wide budget for MCP tool calls: `limit` calls per minute, all of
/// which may arrive as one burst.
pub struct RateLimiter {
    limit: u32,
    /// `None` for a zero limit, which rejects every call.
    inner: Option<DirectLimiter>,
}

impl RateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        let inner = NonZeroU32::new(limit)
            .map(|n| governor::RateLimiter::direct(Quota::per_minute(n).allow_burst(n)));
        Self { limit, inner }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn try_acquire(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|limiter| limiter.check().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_calls_beyond_limit() {
        let limiter = RateLimiter::per_minute(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.limit(), 2);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let limiter = RateLimiter::per_minute(0);
        assert!(!limiter.try_acquire());
    }
}
