//! Response bodies not already provided by `kbw_core::types`.

mod error_response;
mod health;

pub use self::error_response::ErrorResponse;
pub use self::health::Health;
