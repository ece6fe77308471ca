//! Like and bookmark edges.

use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{post_bookmarks, post_likes};

/// Data for inserting a like edge.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = post_likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPostLike {
    pub post_id: Uuid,
    pub user_id: Uuid,
}

/// Data for inserting a bookmark edge.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = post_bookmarks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPostBookmark {
    pub post_id: Uuid,
    pub user_id: Uuid,
}
