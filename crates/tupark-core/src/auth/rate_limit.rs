use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// In-memory sliding-window request limiter.
///
/// Tracks requests per key (the client address) and rejects once the count
/// reaches `max_requests` within `window`.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window: Duration::from_secs(window_secs.max(1)),
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Check and count a request for `key`. Returns `Ok(())` if allowed,
    /// or `Err(seconds_until_retry)` if limited.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    /// [`check`](Self::check) against an explicit instant.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut map = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        let entries = map.entry(key.to_string()).or_default();
        entries.retain(|t| now.saturating_duration_since(*t) < self.window);

        if entries.len() >= self.max_requests as usize {
            let retry_after = entries
                .first()
                .map(|oldest| {
                    self.window
                        .saturating_sub(now.saturating_duration_since(*oldest))
                        .as_secs()
                })
                .unwrap_or(self.window.as_secs());
            return Err(retry_after.max(1));
        }

        entries.push(now);
        Ok(())
    }

    /// Remove expired entries to prevent memory growth.
    /// Call this periodically.
    pub fn cleanup(&self) {
        let mut map = self.hits.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        map.retain(|_, entries| {
            entries.retain(|t| now.saturating_duration_since(*t) < self.window);
            !entries.is_empty()
        });
    }

    /// Number of keys with requests inside the window (before cleanup).
    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
