//! Domain types exchanged between the gateway, the stores and the client.

mod comment;
mod engagement;
mod moderation;
mod post;

pub use comment::{
    Comment, MAX_COMMENT_LENGTH, NewComment, TOMBSTONE_CONTENT, validate_comment_content,
};
pub use engagement::{EngagementKind, EngagementState, EngagementSummary, ReactionState};
pub use moderation::{ModerationCategory, ModerationVerdict, SubmitComment, UNVERIFIED_REASON};
pub use post::{Post, PostChanges, PostFields, PostStatus};
