use crate::store::BackingStore;
use tracing::warn;

pub enum Verdict {
    Allowed,
    Throttled,
}

/// Fixed-window counter keyed by client IP. Fails open: a backing-store
/// error during the INCR/EXPIRE sequence is treated as `Allowed` rather
/// than rejecting traffic because of a limiter-only outage.
pub struct RateLimiter {
    limit: u64,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(limit: u64, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }

    pub async fn check(&self, store: &dyn BackingStore, ip: &str) -> Verdict {
        let key = format!("ratelimit:{ip}");
        let n = match store.incr(&key).await {
            Ok(n) => n,
            Err(e) => {
                warn!(operation = "incr", error = %e, "redis_connection_error");
                return Verdict::Allowed;
            }
        };

        if n == 1 {
            if let Err(e) = store.expire(&key, self.window_seconds).await {
                warn!(operation = "expire", error = %e, "redis_connection_error");
            }
        }

        if n as u64 > self.limit {
            warn!(ip, count = n, limit = self.limit, "rate_limit_exceeded");
            Verdict::Throttled
        } else {
            Verdict::Allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeStore;

    #[tokio::test]
    async fn allows_up_to_the_limit_then_throttles() {
        let store = FakeStore::new();
        let limiter = RateLimiter::new(2, 60);

        assert!(matches!(
            limiter.check(&store, "1.2.3.4").await,
            Verdict::Allowed
        ));
        assert!(matches!(
            limiter.check(&store, "1.2.3.4").await,
            Verdict::Allowed
        ));
        assert!(matches!(
            limiter.check(&store, "1.2.3.4").await,
            Verdict::Throttled
        ));
    }

    #[tokio::test]
    async fn fails_open_on_backing_store_error() {
        let store = FakeStore::failing();
        let limiter = RateLimiter::new(1, 60);
        assert!(matches!(
            limiter.check(&store, "9.9.9.9").await,
            Verdict::Allowed
        ));
    }

    #[tokio::test]
    async fn counters_are_independent_per_ip() {
        let store = FakeStore::new();
        let limiter = RateLimiter::new(1, 60);
        assert!(matches!(
            limiter.check(&store, "1.1.1.1").await,
            Verdict::Allowed
        ));
        assert!(matches!(
            limiter.check(&store, "2.2.2.2").await,
            Verdict::Allowed
        ));
    }
}
