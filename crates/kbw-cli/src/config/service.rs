//! Service configuration with CLI argument parsing.
//!
//! The server's [`ServiceConfig`](ServerServiceConfig) is a validated builder
//! without clap attributes. This module carries the clap side and converts.
//!
//! ```bash
//! export AUTH_JWT_SECRET="at-least-thirty-two-bytes-of-secret"
//! export ALLOWED_EMAIL_DOMAIN="kbw.vc"
//! export RATE_LIMIT_MAX_REQUESTS=10
//! export RATE_LIMIT_WINDOW_SECS=60
//! kbw --memory-store
//! ```

use anyhow::Context;
use clap::Args;
use kbw_core::identity::DEFAULT_ALLOWED_DOMAIN;
use kbw_server::service::ServiceConfig as ServerServiceConfig;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// CLI service configuration with command-line argument parsing.
#[derive(Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Shared HS256 secret used to verify session tokens.
    #[arg(long, env = "AUTH_JWT_SECRET", hide_env_values = true)]
    pub auth_jwt_secret: String,

    /// The only email domain allowed to hold a session.
    #[arg(long, env = "ALLOWED_EMAIL_DOMAIN", default_value = DEFAULT_ALLOWED_DOMAIN)]
    pub allowed_email_domain: String,

    /// Comment submissions accepted per client in one window.
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 10)]
    pub rate_limit_max_requests: u32,

    /// Rate limit window length in seconds.
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    pub rate_limit_window_secs: u64,
}

impl ServiceConfig {
    /// Converts into the validated server configuration.
    pub fn to_server_config(&self) -> anyhow::Result<ServerServiceConfig> {
        ServerServiceConfig::builder()
            .with_auth_jwt_secret(self.auth_jwt_secret.clone())
            .with_allowed_email_domain(self.allowed_email_domain.clone())
            .with_rate_limit_max_requests(self.rate_limit_max_requests)
            .with_rate_limit_window_secs(self.rate_limit_window_secs)
            .build()
            .context("failed to build service configuration")
    }

    /// Logs service configuration at info level.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            allowed_email_domain = %self.allowed_email_domain,
            rate_limit_max_requests = self.rate_limit_max_requests,
            rate_limit_window_secs = self.rate_limit_window_secs,
            "Service configuration"
        );
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

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> ServiceConfig {
        ServiceConfig {
            auth_jwt_secret: secret.to_owned(),
            allowed_email_domain: DEFAULT_ALLOWED_DOMAIN.to_owned(),
            rate_limit_max_requests: 10,
            rate_limit_window_secs: 60,
        }
    }

    #[test]
    fn converts_to_server_config() -> anyhow::Result<()> {
        let server = config("test-secret-that-is-long-enough-for-hs256").to_server_config()?;
        assert_eq!(server.allowed_email_domain, DEFAULT_ALLOWED_DOMAIN);
        assert_eq!(server.rate_limit_max_requests, 10);
        Ok(())
    }

    #[test]
    fn short_secret_fails_conversion() {
        assert!(config("short").to_server_config().is_err());
    }

    #[test]
    fn debug_masks_secret() {
        let rendered = format!("{:?}", config("test-secret-that-is-long-enough-for-hs256"));
        assert!(!rendered.contains("test-secret"));
    }
}
