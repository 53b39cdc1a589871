use anyhow::{anyhow, Result};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

type KeyedLimiter =
    GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock, StateInformationMiddleware>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the next request would be let through
    pub reset_in: Duration,
}

/// Per-caller request budget of `max_requests` spread over `window`
pub struct RateLimiter {
    limiter: KeyedLimiter,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        let burst = NonZeroU32::new(max_requests).ok_or_else(|| anyhow!("Invalid rate limit"))?;
        let quota = Quota::with_period(window / max_requests)
            .ok_or_else(|| anyhow!("Invalid rate limit window"))?
            .allow_burst(burst);

        Ok(Self {
            limiter: GovRateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>(),
            clock: DefaultClock::default(),
        })
    }

    pub fn check(&self, key: &str) -> RateDecision {
        match self.limiter.check_key(&key.to_string()) {
            Ok(snapshot) => RateDecision {
                allowed: true,
                remaining: snapshot.remaining_burst_capacity(),
                reset_in: Duration::ZERO,
            },
            Err(not_until) => RateDecision {
                allowed: false,
                remaining: 0,
                reset_in: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    /// Forget callers whose budget has fully refilled
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}
