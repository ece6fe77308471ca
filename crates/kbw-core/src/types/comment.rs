use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Content substituted on soft-delete.
pub const TOMBSTONE_CONTENT: &str = "[This comment has been deleted]";

/// Hard ceiling on comment length, counted in Unicode scalar values.
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// A node in a post's comment forest.
///
/// Replies are not stored on the node; they are derived from `parent_id`
/// back-references by whoever builds the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub created_at: Timestamp,
    pub is_moderated: bool,
    pub reaction_count: i64,
    /// Whether the requesting viewer has reacted. Always false when anonymous.
    #[serde(default)]
    pub reacted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Comment {
    /// Returns whether `viewer` may see this node.
    ///
    /// Approved comments are public. Pending ones are visible only to their
    /// author. The rule applies per node and is not inherited from ancestors.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.is_moderated || (viewer.is_some() && self.author_id == viewer)
    }

    /// Returns whether the comment has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns whether `user_id` authored this comment.
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == Some(user_id)
    }

    /// Replaces the content with the tombstone. Idempotent.
    pub fn tombstone(&mut self, at: Timestamp) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(at);
        }
        self.content = TOMBSTONE_CONTENT.to_owned();
    }
}

/// A comment approved by the classifier and ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub content: String,
}

/// Rejects empty, whitespace-only and over-length content.
pub fn validate_comment_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::validation("comment cannot be empty"));
    }

    let length = content.chars().count();
    if length > MAX_COMMENT_LENGTH {
        return Err(Error::validation(format!(
            "comment is too long ({length} characters, maximum is {MAX_COMMENT_LENGTH})"
        )));
    }

    Ok(())
}
