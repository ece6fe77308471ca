//! Application state and dependency injection.

mod config;
mod gateway;
mod security;

use kbw_core::store::Storage;
use kbw_moderation::ModerationService;

pub use crate::service::config::{ServiceConfig, ServiceConfigBuilder, ServiceConfigBuilderError};
pub use crate::service::gateway::ModerationGateway;
pub use crate::service::security::{
    MIN_SECRET_LENGTH, RateLimitConfig, RateLimitKey, RateLimiter, SessionKeys, SessionKeysConfig,
};
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    // External services:
    pub storage: Storage,
    pub moderation: ModerationService,

    // Internal services:
    pub rate_limiter: RateLimiter,
    pub session_keys: SessionKeys,
    pub gateway: ModerationGateway,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Storage and the classifier are created by the caller so that tests and
    /// development runs can substitute in-process backends.
    pub fn from_config(
        config: &ServiceConfig,
        storage: Storage,
        moderation: ModerationService,
    ) -> Result<Self> {
        let rate_limiter = config.create_rate_limiter();
        let session_keys = config.load_session_keys()?;
        let gateway =
            ModerationGateway::new(moderation.clone(), storage.clone(), rate_limiter.clone());

        Ok(Self {
            storage,
            moderation,
            rate_limiter,
            session_keys,
            gateway,
        })
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(storage: Storage);
impl_di!(moderation: ModerationService);

// Internal services:
impl_di!(rate_limiter: RateLimiter);
impl_di!(session_keys: SessionKeys);
impl_di!(gateway: ModerationGateway);
