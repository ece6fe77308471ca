//! Request extractors with JSON error responses.
//!
//! - [`AuthHeader`], [`AuthClaims`] and [`AuthState`] authenticate bearer tokens.
//!   Use `Option<AuthState>` on routes where signing in is optional.
//! - [`Json`], [`ValidateJson`] and [`Path`] replace their axum counterparts
//!   so rejections use the shared error body.
//! - [`ClientIdentity`] names the caller for rate limiting.

pub mod auth;
pub mod reject;

mod client_identity;

pub use crate::extract::auth::{AuthClaims, AuthHeader, AuthState};
pub use crate::extract::client_identity::ClientIdentity;
pub use crate::extract::reject::{Json, Path, ValidateJson};
