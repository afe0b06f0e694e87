use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc, Duration};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_size: Duration,
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::minutes(1),
            max_attempts: 10,
        }
    }
}

/// Attempt times for one key, oldest first.
#[derive(Debug, Default)]
struct AttemptLog(VecDeque<DateTime<Utc>>);

impl AttemptLog {
    fn expire(&mut self, cutoff: DateTime<Utc>) {
        while self.0.front().map_or(false, |ts| *ts <= cutoff) {
            self.0.pop_front();
        }
    }

    fn admit(&mut self, now: DateTime<Utc>, max_attempts: u32) -> bool {
        if self.0.len() >= max_attempts as usize {
            return false;
        }
        self.0.push_back(now);
        true
    }
}

/// Sliding-window limiter for login attempts, keyed by email.
///
/// Keys are compared case-insensitively so `Alice@x` and `alice@x` share a
/// budget. Rejected attempts are not recorded.
#[derive(Debug)]
pub struct RateLimiter {
    attempts: Arc<RwLock<HashMap<String, AttemptLog>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Records an attempt and returns `false` once the key is over its limit.
    pub async fn check_rate_limit(&self, key: &str) -> bool {
        let now = Utc::now();
        let mut attempts = self.attempts.write().await;

        let log = attempts.entry(key.to_lowercase()).or_default();
        log.expire(now - self.config.window_size);
        log.admit(now, self.config.max_attempts)
    }

    /// Drops keys whose every attempt has left the window.
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.config.window_size;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, log| {
            log.expire(cutoff);
            !log.0.is_empty()
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.attempts.read().await.len()
    }
}
