#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};

// Tracing target constants for consistent logging.

/// Tracing target for authentication.
pub const TRACING_TARGET_AUTHENTICATION: &str = "kbw_server::extract::auth";

/// Tracing target for the moderation gateway.
pub const TRACING_TARGET_GATEWAY: &str = "kbw_server::service::gateway";

/// Tracing target for the rate limiter.
pub const TRACING_TARGET_RATE_LIMIT: &str = "kbw_server::service::rate_limiter";
