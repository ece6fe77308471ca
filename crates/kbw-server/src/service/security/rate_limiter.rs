//! In-memory fixed-window rate limiter.
//!
//! Each key gets a counter and a reset instant. The first request of a new or
//! expired window starts the count at one; later requests increment it and
//! are refused once it exceeds the limit. There is no smoothing between
//! windows. State lives in this process only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::TRACING_TARGET_RATE_LIMIT;
use crate::extract::ClientIdentity;

/// Rate limiter key.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Creates a key from an arbitrary identifier.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl From<&ClientIdentity> for RateLimitKey {
    fn from(identity: &ClientIdentity) -> Self {
        Self(identity.to_string())
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct RateLimitConfig {
    /// Maximum number of requests accepted per key in one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Creates a configuration for `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_secs: window.as_secs(),
        }
    }

    /// Returns the window length.
    #[inline]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
struct RateLimitState {
    windows: HashMap<RateLimitKey, FixedWindow>,
    next_sweep: Option<Instant>,
}

impl RateLimitState {
    /// Drops expired windows at most once per window length.
    fn sweep(&mut self, now: Instant, window: Duration) {
        if self.next_sweep.is_some_and(|at| now < at) {
            return;
        }

        let before_count = self.windows.len();
        self.windows.retain(|_, w| now < w.reset_at);
        self.next_sweep = Some(now + window);

        let removed = before_count - self.windows.len();
        if removed > 0 {
            tracing::debug!(
                target: TRACING_TARGET_RATE_LIMIT,
                removed_count = removed,
                remaining_count = self.windows.len(),
                "Swept expired rate limit windows"
            );
        }
    }
}

/// Fixed-window rate limiter shared by every request handler.
///
/// The whole table sits behind one mutex, so the increment-or-reset of a key
/// is atomic. Cloning shares the table.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<RateLimitState>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        tracing::info!(
            target: TRACING_TARGET_RATE_LIMIT,
            max_requests = config.max_requests,
            window_secs = config.window_secs,
            "Rate limiter initialized"
        );

        Self {
            state: Arc::new(Mutex::new(RateLimitState {
                windows: HashMap::new(),
                next_sweep: None,
            })),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records a request for `key` and returns whether it is allowed.
    pub async fn check_and_consume(&self, key: &RateLimitKey) -> bool {
        self.check_and_consume_at(key, Instant::now()).await
    }

    /// Records a request for `key` observed at `now`.
    pub async fn check_and_consume_at(&self, key: &RateLimitKey, now: Instant) -> bool {
        let window = self.config.window();
        let mut state = self.state.lock().await;
        state.sweep(now, window);

        let entry = state
            .windows
            .entry(key.clone())
            .and_modify(|w| {
                if now >= w.reset_at {
                    *w = FixedWindow {
                        count: 0,
                        reset_at: now + window,
                    };
                }
            })
            .or_insert(FixedWindow {
                count: 0,
                reset_at: now + window,
            });

        entry.count = entry.count.saturating_add(1);
        let allowed = entry.count <= self.config.max_requests;

        if !allowed {
            tracing::warn!(
                target: TRACING_TARGET_RATE_LIMIT,
                key = %key,
                count = entry.count,
                retry_after_secs = entry.reset_at.saturating_duration_since(now).as_secs(),
                "Rate limit exceeded"
            );
        }

        allowed
    }

    /// Records a request and fails with a rate-limit error when refused.
    pub async fn check(&self, key: &RateLimitKey) -> kbw_core::Result<()> {
        if self.check_and_consume(key).await {
            Ok(())
        } else {
            Err(kbw_core::Error::rate_limited())
        }
    }

    /// Returns the number of tracked keys.
    pub async fn size(&self) -> usize {
        self.state.lock().await.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_exactly_the_limit() -> anyhow::Result<()> {
        let limiter = RateLimiter::default();
        let key = RateLimitKey::new("203.0.113.7");
        let start = Instant::now();

        for _ in 0..10 {
            assert!(limiter.check_and_consume_at(&key, start).await);
        }
        assert!(!limiter.check_and_consume_at(&key, start).await);

        Ok(())
    }

    #[tokio::test]
    async fn resets_after_window() -> anyhow::Result<()> {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(60)));
        let key = RateLimitKey::new("203.0.113.7");
        let start = Instant::now();

        assert!(limiter.check_and_consume_at(&key, start).await);
        assert!(limiter.check_and_consume_at(&key, start).await);
        assert!(!limiter.check_and_consume_at(&key, start + Duration::from_secs(59)).await);

        let later = start + Duration::from_secs(60);
        assert!(limiter.check_and_consume_at(&key, later).await);
        assert!(limiter.check_and_consume_at(&key, later).await);
        assert!(!limiter.check_and_consume_at(&key, later).await);

        Ok(())
    }

    #[tokio::test]
    async fn keys_are_independent() -> anyhow::Result<()> {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_secs(60)));
        let now = Instant::now();

        assert!(limiter.check_and_consume_at(&RateLimitKey::new("a"), now).await);
        assert!(limiter.check_and_consume_at(&RateLimitKey::new("b"), now).await);
        assert!(!limiter.check_and_consume_at(&RateLimitKey::new("a"), now).await);

        Ok(())
    }

    #[tokio::test]
    async fn sweeps_expired_windows() -> anyhow::Result<()> {
        let limiter = RateLimiter::new(RateLimitConfig::new(5, Duration::from_secs(60)));
        let start = Instant::now();

        limiter.check_and_consume_at(&RateLimitKey::new("a"), start).await;
        limiter.check_and_consume_at(&RateLimitKey::new("b"), start).await;
        assert_eq!(limiter.size().await, 2);

        let later = start + Duration::from_secs(120);
        limiter.check_and_consume_at(&RateLimitKey::new("c"), later).await;
        assert_eq!(limiter.size().await, 1);

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_requests_never_exceed_limit() -> anyhow::Result<()> {
        let limiter = RateLimiter::default();
        let key = RateLimitKey::new("shared");

        let mut handles = Vec::new();
        for _ in 0..25 {
            let limiter = limiter.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                limiter.check_and_consume(&key).await
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await? {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);

        Ok(())
    }

    #[tokio::test]
    async fn check_maps_refusal_to_rate_limited() -> anyhow::Result<()> {
        let limiter = RateLimiter::new(RateLimitConfig::new(0, Duration::from_secs(60)));
        let error = limiter
            .check(&RateLimitKey::new("a"))
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("request allowed"))?;
        assert_eq!(error.kind(), kbw_core::ErrorKind::RateLimited);
        Ok(())
    }
}
