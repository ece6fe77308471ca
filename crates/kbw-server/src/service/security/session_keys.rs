//! Shared-secret keys for verifying session tokens.
//!
//! Tokens are issued by the identity provider and signed with HS256 using a
//! secret shared with this server.

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use kbw_core::identity::{DEFAULT_ALLOWED_DOMAIN, DomainPolicy};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, TRACING_TARGET_AUTHENTICATION};

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Session key configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionKeysConfig {
    /// Shared HS256 secret used to verify bearer tokens.
    pub auth_jwt_secret: String,

    /// The only email domain allowed to hold a session.
    #[serde(default = "SessionKeysConfig::default_allowed_email_domain")]
    pub allowed_email_domain: String,
}

impl SessionKeysConfig {
    /// Creates a configuration for `secret` with the default domain.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            auth_jwt_secret: secret.into(),
            allowed_email_domain: Self::default_allowed_email_domain(),
        }
    }

    /// Sets the allowed email domain.
    pub fn with_allowed_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_email_domain = domain.into();
        self
    }

    fn default_allowed_email_domain() -> String {
        DEFAULT_ALLOWED_DOMAIN.to_owned()
    }

    /// Validates the secret length and the domain.
    pub fn validate(&self) -> Result<()> {
        if self.auth_jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(Error::config(format!(
                "AUTH_JWT_SECRET must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }

        if self.allowed_email_domain.trim().is_empty() {
            return Err(Error::config("ALLOWED_EMAIL_DOMAIN cannot be empty"));
        }

        Ok(())
    }
}

impl fmt::Debug for SessionKeysConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeysConfig")
            .field("auth_jwt_secret", &"****")
            .field("allowed_email_domain", &self.allowed_email_domain)
            .finish()
    }
}

/// Keys and policy used to authenticate callers.
///
/// Cheap to clone; the keys are shared.
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<SessionKeysInner>,
}

struct SessionKeysInner {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    domain_policy: DomainPolicy,
}

impl SessionKeys {
    /// Creates keys from validated configuration.
    pub fn from_config(config: &SessionKeysConfig) -> Result<Self> {
        config.validate()?;

        let secret = config.auth_jwt_secret.as_bytes();
        let domain_policy = DomainPolicy::new(&config.allowed_email_domain);

        tracing::info!(
            target: TRACING_TARGET_AUTHENTICATION,
            allowed_domain = %domain_policy.domain(),
            "Session keys loaded"
        );

        Ok(Self {
            inner: Arc::new(SessionKeysInner {
                decoding_key: DecodingKey::from_secret(secret),
                encoding_key: EncodingKey::from_secret(secret),
                domain_policy,
            }),
        })
    }

    /// Returns the key used to verify tokens.
    #[inline]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.inner.decoding_key
    }

    /// Returns the key used to sign tokens.
    #[inline]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.inner.encoding_key
    }

    /// Returns the email domain policy.
    #[inline]
    pub fn domain_policy(&self) -> &DomainPolicy {
        &self.inner.domain_policy
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("domain", &self.inner.domain_policy.domain())
            .finish_non_exhaustive()
    }
}
