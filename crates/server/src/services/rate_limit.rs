//! Per-user limiter for product extraction.
//!
//! Extraction fetches third-party pages and may call a paid LLM API, so it is
//! budgeted per account in addition to the per-IP layers in
//! [`crate::middleware::rate_limit`].

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

use showcase_core::UserId;

type KeyedLimiter = RateLimiter<UserId, DefaultKeyedStateStore<UserId>, DefaultClock>;

/// Keyed limiter allowing `per_minute` extractions per user.
#[derive(Clone)]
pub struct ExtractionLimiter {
    limiter: Arc<KeyedLimiter>,
}

impl ExtractionLimiter {
    /// Build a limiter. A rate of zero is treated as one.
    #[must_use]
    pub fn new(per_minute: u32) -> Self {
        let rate = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(rate))),
        }
    }

    /// Consume one request for `user`. Returns `false` when the budget is spent.
    #[must_use]
    pub fn check(&self, user: UserId) -> bool {
        let allowed = self.limiter.check_key(&user).is_ok();
        if !allowed {
            tracing::warn!(user_id = %user, "extraction rate limit exceeded");
        }
        allowed
    }

    /// Drop state for keys whose budget has fully replenished.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}

impl std::fmt::Debug for ExtractionLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionLimiter")
            .field("tracked_users", &self.limiter.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_requests_per_user() {
        let limiter = ExtractionLimiter::new(3);
        let alice = UserId::new(1);
        let bob = UserId::new(2);

        assert!(limiter.check(alice));
        assert!(limiter.check(alice));
        assert!(limiter.check(alice));
        assert!(!limiter.check(alice));

        assert!(limiter.check(bob));
    }

    #[test]
    fn zero_rate_still_allows_one() {
        let limiter = ExtractionLimiter::new(0);
        let user = UserId::new(7);
        assert!(limiter.check(user));
        assert!(!limiter.check(user));
    }
}
