//! Bearer-token authentication.
//!
//! - [`AuthHeader`] decodes and verifies the HS256 JWT.
//! - [`AuthClaims`] is the verified claim set.
//! - [`AuthState`] additionally enforces the email domain policy and is what
//!   handlers take, either directly or as `Option<AuthState>`.

mod auth_state;
mod jwt_header;

pub use self::auth_state::AuthState;
pub(crate) use self::auth_state::viewer_id;
pub use self::jwt_header::{AuthClaims, AuthHeader};
