use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by caller identity and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
        }
    }

    pub fn allow(&self, key: &str, route: &str) -> (bool, u32) {
        let bucket_key = format!("{key}:{route}");
        let now = Instant::now();
        let window = self.window;

        let mut entry = self.buckets.entry(bucket_key).or_default();
        entry.retain(|instant| now.duration_since(*instant) < window);

        let remaining = self.max_requests.saturating_sub(entry.len() as u32);
        if remaining == 0 {
            return (false, 0);
        }

        entry.push(now);
        (true, remaining.saturating_sub(1))
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_blocks_at_the_limit() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);

        assert_eq!(limiter.allow("user-1", "/api/waitlist"), (true, 1));
        assert_eq!(limiter.allow("user-1", "/api/waitlist"), (true, 0));
        assert_eq!(limiter.allow("user-1", "/api/waitlist"), (false, 0));
    }

    #[test]
    fn buckets_are_isolated_per_key_and_route() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 1);

        assert!(limiter.allow("user-1", "/api/waitlist").0);
        assert!(limiter.allow("user-2", "/api/waitlist").0);
        assert!(limiter.allow("user-1", "/api/stats").0);
        assert!(!limiter.allow("user-1", "/api/waitlist").0);
    }
}
