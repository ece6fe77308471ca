use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::service::{MIN_SECRET_LENGTH, RateLimitConfig, RateLimiter, SessionKeys, SessionKeysConfig};

/// Default values for configuration options.
mod defaults {
    /// Default allowed email domain.
    pub const ALLOWED_EMAIL_DOMAIN: &str = kbw_core::identity::DEFAULT_ALLOWED_DOMAIN;

    /// Default number of comment submissions per window.
    pub const RATE_LIMIT_MAX_REQUESTS: u32 = 10;

    /// Default rate limit window in seconds.
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Clone, Serialize, Deserialize, Builder)]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// Shared HS256 secret used to verify session tokens.
    pub auth_jwt_secret: String,

    /// The only email domain allowed to hold a session.
    #[builder(default = "defaults::ALLOWED_EMAIL_DOMAIN.to_string()")]
    pub allowed_email_domain: String,

    /// Comment submissions accepted per client in one window.
    #[builder(default = "defaults::RATE_LIMIT_MAX_REQUESTS")]
    pub rate_limit_max_requests: u32,

    /// Rate limit window length in seconds.
    #[builder(default = "defaults::RATE_LIMIT_WINDOW_SECS")]
    pub rate_limit_window_secs: u64,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Loads session keys from the configured secret.
    pub fn load_session_keys(&self) -> Result<SessionKeys> {
        let config = SessionKeysConfig::new(&self.auth_jwt_secret)
            .with_allowed_email_domain(&self.allowed_email_domain);
        SessionKeys::from_config(&config)
    }

    /// Creates the comment submission rate limiter.
    pub fn create_rate_limiter(&self) -> RateLimiter {
        let window = Duration::from_secs(self.rate_limit_window_secs);
        RateLimiter::new(RateLimitConfig::new(self.rate_limit_max_requests, window))
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("auth_jwt_secret", &"****")
            .field("allowed_email_domain", &self.allowed_email_domain)
            .field("rate_limit_max_requests", &self.rate_limit_max_requests)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .finish()
    }
}

impl ServiceConfigBuilder {
    /// Wrapper for builder validation that returns String errors.
    fn validate(builder: &ServiceConfigBuilder) -> Result<(), String> {
        if let Some(secret) = &builder.auth_jwt_secret
            && secret.len() < MIN_SECRET_LENGTH
        {
            return Err(format!(
                "JWT secret must be at least {MIN_SECRET_LENGTH} bytes"
            ));
        }

        if let Some(domain) = &builder.allowed_email_domain
            && domain.trim().is_empty()
        {
            return Err("Allowed email domain cannot be empty".to_string());
        }

        if let Some(max_requests) = &builder.rate_limit_max_requests
            && *max_requests == 0
        {
            return Err("Rate limit must allow at least one request".to_string());
        }

        if let Some(window_secs) = &builder.rate_limit_window_secs {
            if *window_secs < 1 {
                return Err("Rate limit window must be at least 1 second".to_string());
            }
            if *window_secs > 86_400 {
                return Err("Rate limit window cannot exceed one day".to_string());
            }
        }

        Ok(())
    }
}
