#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for HTTP API calls.
pub const TRACING_TARGET_API: &str = "kbw_client::api";

/// Tracing target for the comment tree store.
pub const TRACING_TARGET_COMMENTS: &str = "kbw_client::comments";

/// Tracing target for draft auto-save.
pub const TRACING_TARGET_DRAFTS: &str = "kbw_client::drafts";

/// Tracing target for like and bookmark toggles.
pub const TRACING_TARGET_ENGAGEMENT: &str = "kbw_client::engagement";

/// Tracing target for sign-in and session changes.
pub const TRACING_TARGET_IDENTITY: &str = "kbw_client::identity";

pub mod api;
pub mod comments;
pub mod drafts;
pub mod engagement;
pub mod identity;
pub mod optimistic;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use api::MockApi;
pub use api::{BlogApi, HttpApi};
pub use comments::{CommentComposer, CommentForest, CommentNode, CommentTreeStore, Feedback};
pub use drafts::{DraftConfig, DraftEditor, DraftStatus, SaveOutcome};
pub use engagement::{EngagementToggles, ToggleOutcome};
pub use identity::{GuardedIdentity, IdentityProvider};
pub use optimistic::{Optimistic, Phase, Ticket};
pub use session::{Session, SessionInfo};
