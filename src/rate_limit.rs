use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Sliding window in-memory rate limiter (pod local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            enabled,
        }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub contact_limit: usize,
    pub contact_window: Duration,
    pub message_limit: usize,
    pub message_window: Duration,
    pub checkout_limit: usize,
    pub checkout_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        fn dur_env(name: &str, default: u64) -> Duration {
            Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default))
        }
        Self {
            contact_limit: usize_env("RL_CONTACT_LIMIT", 3),
            contact_window: dur_env("RL_CONTACT_WINDOW", 3600),
            message_limit: usize_env("RL_MESSAGE_LIMIT", 20),
            message_window: dur_env("RL_MESSAGE_WINDOW", 60),
            checkout_limit: usize_env("RL_CHECKOUT_LIMIT", 10),
            checkout_window: dur_env("RL_CHECKOUT_WINDOW", 60),
        }
    }
}

/// High level guard used by handlers. Contact is keyed by peer address,
/// messages and checkout by user id.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }
    pub fn allow_contact(&self, ip: &str) -> bool {
        self.limiter.check(&format!("contact:{ip}"), self.cfg.contact_limit, self.cfg.contact_window)
    }
    pub fn allow_message(&self, user: &str) -> bool {
        self.limiter.check(&format!("message:{user}"), self.cfg.message_limit, self.cfg.message_window)
    }
    pub fn allow_checkout(&self, user: &str) -> bool {
        self.limiter.check(&format!("checkout:{user}"), self.cfg.checkout_limit, self.cfg.checkout_window)
    }
}
