//! Comment model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::{comment_reactions, comments};

/// A row of the `comments` table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    /// Unique comment identifier.
    pub id: Uuid,
    /// Post the comment belongs to.
    pub post_id: Uuid,
    /// Parent comment for replies (NULL for roots).
    pub parent_id: Option<Uuid>,
    /// Author account (NULL for anonymous comments).
    pub author_id: Option<Uuid>,
    /// Comment text, or the tombstone once deleted.
    pub content: String,
    /// Whether the classifier approved the comment.
    pub is_moderated: bool,
    /// Denormalized number of reactions.
    pub reaction_count: i64,
    /// Timestamp when the comment was created.
    pub created_at: Timestamp,
    /// Timestamp when the comment was soft-deleted.
    pub deleted_at: Option<Timestamp>,
}

impl Comment {
    /// Converts the row into the domain type, marking whether `reacted` holds for the viewer.
    pub fn into_domain(self, reacted: bool) -> kbw_core::types::Comment {
        kbw_core::types::Comment {
            id: self.id,
            post_id: self.post_id,
            parent_id: self.parent_id,
            author_id: self.author_id,
            content: self.content,
            created_at: self.created_at.into(),
            is_moderated: self.is_moderated,
            reaction_count: self.reaction_count,
            reacted,
            deleted_at: self.deleted_at.map(Into::into),
        }
    }
}

/// Data for inserting a comment.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub is_moderated: bool,
}

impl NewComment {
    /// Creates an insert for a comment the classifier already approved.
    pub fn approved(new_comment: kbw_core::types::NewComment) -> Self {
        Self {
            id: Uuid::now_v7(),
            post_id: new_comment.post_id,
            parent_id: new_comment.parent_id,
            author_id: new_comment.author_id,
            content: new_comment.content,
            is_moderated: true,
        }
    }
}

/// A reaction edge between a comment and a user.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = comment_reactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentReaction {
    pub comment_id: Uuid,
    pub user_id: Uuid,
}
