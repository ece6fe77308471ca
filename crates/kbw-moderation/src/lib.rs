#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for classification requests.
pub const TRACING_TARGET: &str = "kbw_moderation::service";

/// Tracing target for the OpenAI-compatible client.
pub const TRACING_TARGET_CLIENT: &str = "kbw_moderation::openai";

mod assessment;
mod error;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
mod mock;
mod openai;
mod policy;
mod provider;
mod service;

pub use assessment::{Assessment, extract_json_object, parse_assessment};
pub use error::{Error, Result};
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use mock::MockClassifier;
pub use openai::{ClassifierConfig, OpenAiClassifier};
pub use policy::ModerationPolicy;
pub use provider::{ClassifierProvider, ClassifyRequest};
pub use service::ModerationService;
