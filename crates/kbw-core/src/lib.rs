#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for identity policy decisions.
pub const TRACING_TARGET_IDENTITY: &str = "kbw_core::identity";

/// Tracing target for storage operations.
pub const TRACING_TARGET_STORE: &str = "kbw_core::store";

mod error;

pub mod identity;
pub mod store;
pub mod types;

pub use error::{BoxedError, Error, ErrorKind, Result};
