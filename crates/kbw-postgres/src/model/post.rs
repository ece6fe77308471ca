//! Post model for PostgreSQL database operations.

use diesel::prelude::*;
use jiff_diesel::Timestamp;
use uuid::Uuid;

use crate::schema::posts;
use crate::types::PostStatus;

/// A row of the `posts` table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<Option<String>>,
    pub status: PostStatus,
    pub cover_image_url: Option<String>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    /// Returns the non-null tags.
    pub fn tags(&self) -> Vec<String> {
        self.tags.iter().flatten().cloned().collect()
    }
}

impl From<Post> for kbw_core::types::Post {
    fn from(post: Post) -> Self {
        let tags = post.tags();
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            excerpt: post.excerpt,
            content: post.content,
            tags,
            status: post.status.into(),
            cover_image_url: post.cover_image_url,
            published_at: post.published_at.map(Into::into),
            created_at: post.created_at.into(),
            updated_at: post.updated_at.into(),
        }
    }
}

/// Data for inserting an empty draft.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub status: PostStatus,
}

impl NewPost {
    /// Creates an empty draft owned by `author_id`.
    pub fn draft(author_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            author_id,
            status: PostStatus::Draft,
        }
    }
}

/// Field-level partial update of a post.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdatePost {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<Option<String>>>,
    pub cover_image_url: Option<Option<String>>,
    pub status: Option<PostStatus>,
    pub published_at: Option<Option<Timestamp>>,
    pub updated_at: Option<Timestamp>,
}

impl UpdatePost {
    /// Creates an update applying `changes` and bumping `updated_at`.
    pub fn from_changes(changes: kbw_core::types::PostChanges) -> Self {
        Self {
            title: changes.title,
            excerpt: changes.excerpt,
            content: changes.content,
            tags: changes
                .tags
                .map(|tags| tags.into_iter().map(Some).collect()),
            cover_image_url: changes.cover_image_url,
            updated_at: Some(jiff::Timestamp::now().into()),
            ..Self::default()
        }
    }

    /// Creates an update moving the post to `status`.
    ///
    /// Publishing stamps `published_at`; returning to draft clears it.
    pub fn transition(status: PostStatus) -> Self {
        let now: Timestamp = jiff::Timestamp::now().into();
        let published_at = match status {
            PostStatus::Published => Some(now),
            PostStatus::Draft => None,
        };

        Self {
            status: Some(status),
            published_at: Some(published_at),
            updated_at: Some(now),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use kbw_core::types::PostChanges;

    use super::*;

    #[test]
    fn test_from_changes_bumps_updated_at() {
        let changes = PostChanges {
            title: Some("Hello".into()),
            tags: Some(vec!["rust".into()]),
            cover_image_url: Some(None),
            ..PostChanges::default()
        };

        let update = UpdatePost::from_changes(changes);
        assert_eq!(update.title.as_deref(), Some("Hello"));
        assert_eq!(update.tags, Some(vec![Some("rust".to_owned())]));
        assert_eq!(update.cover_image_url, Some(None));
        assert!(update.updated_at.is_some());
        assert!(update.status.is_none());
    }

    #[test]
    fn test_transition_stamps_and_clears_published_at() {
        let published = UpdatePost::transition(PostStatus::Published);
        assert!(matches!(published.published_at, Some(Some(_))));

        let draft = UpdatePost::transition(PostStatus::Draft);
        assert_eq!(draft.status, Some(PostStatus::Draft));
        assert!(matches!(draft.published_at, Some(None)));
    }
}
