//! Middleware for `axum::Router` and HTTP request processing.
//!
//! ```rust,ignore
//! use kbw_server::middleware::{
//!     CorsConfig, RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app = kbw_server::handler::routes()
//!     .with_state(state)
//!     .with_security(&CorsConfig::default())
//!     .with_observability()
//!     .with_recovery(&RecoveryConfig::default());
//! ```

mod observability;
mod recovery;
mod security;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, MAX_BODY_SIZE, RouterSecurityExt};
