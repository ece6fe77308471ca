//! Request admission: rate limiting and session keys.

mod rate_limiter;
mod session_keys;

pub use rate_limiter::{RateLimitConfig, RateLimitKey, RateLimiter};
pub use session_keys::{MIN_SECRET_LENGTH, SessionKeys, SessionKeysConfig};
