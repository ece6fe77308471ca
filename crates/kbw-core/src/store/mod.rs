//! Storage ports consumed by the gateway and the HTTP handlers.
//!
//! Every owner-gated mutation takes the owner alongside the id and reports
//! whether a row matched, so the ownership check and the mutation happen in
//! one atomic step. Callers must treat `false`/`None` as "not found or not
//! owned" without distinguishing the two.

mod memory;

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

pub use self::memory::MemoryStore;
use crate::Result;
use crate::types::{
    Comment, EngagementKind, EngagementState, EngagementSummary, NewComment, Post, PostChanges,
    PostStatus, ReactionState,
};

/// Comment persistence.
#[async_trait::async_trait]
pub trait CommentStore: Send + Sync {
    /// Inserts a classifier-approved comment with trusted privileges.
    ///
    /// The stored row is marked as moderated.
    async fn insert_approved_comment(&self, new_comment: NewComment) -> Result<Comment>;

    /// Finds a comment, computing `reacted` for `viewer`.
    async fn find_comment(&self, comment_id: Uuid, viewer: Option<Uuid>)
    -> Result<Option<Comment>>;

    /// Lists every comment of a post ordered by creation time ascending.
    async fn list_post_comments(&self, post_id: Uuid, viewer: Option<Uuid>)
    -> Result<Vec<Comment>>;

    /// Tombstones a live comment owned by `owner_id`.
    ///
    /// Returns `false` when no live comment with that id and owner exists.
    async fn tombstone_comment(&self, comment_id: Uuid, owner_id: Uuid) -> Result<bool>;

    /// Inserts the reaction edge if absent, deletes it if present.
    ///
    /// Returns `None` when the comment does not exist.
    async fn toggle_comment_reaction(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReactionState>>;
}

/// Post persistence.
#[async_trait::async_trait]
pub trait PostStore: Send + Sync {
    /// Creates an empty draft owned by `author_id`.
    async fn create_draft_post(&self, author_id: Uuid) -> Result<Post>;

    /// Finds a post regardless of its status.
    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Lists published posts, newest first.
    async fn list_published_posts(&self) -> Result<Vec<Post>>;

    /// Applies a partial update to a post owned by `owner_id`.
    async fn update_post(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>>;

    /// Moves a post owned by `owner_id` to `status`.
    async fn set_post_status(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        status: PostStatus,
    ) -> Result<Option<Post>>;

    /// Deletes a post owned by `owner_id` together with its comments and edges.
    async fn delete_post(&self, post_id: Uuid, owner_id: Uuid) -> Result<bool>;
}

/// Like and bookmark persistence.
#[async_trait::async_trait]
pub trait EngagementStore: Send + Sync {
    /// Inserts the edge if absent, deletes it if present, and returns the result.
    async fn toggle_engagement(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<EngagementState>;

    /// Returns counts for a post and the viewer's own edges.
    async fn engagement_summary(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<EngagementSummary>;
}

/// The three storage ports bundled for dependency injection.
#[derive(Clone)]
pub struct Storage {
    pub comments: Arc<dyn CommentStore>,
    pub posts: Arc<dyn PostStore>,
    pub engagement: Arc<dyn EngagementStore>,
}

impl Storage {
    /// Creates storage backed by a single backend implementing every port.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: CommentStore + PostStore + EngagementStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            comments: backend.clone(),
            posts: backend.clone(),
            engagement: backend,
        }
    }

    /// Creates empty in-process storage.
    pub fn memory() -> Self {
        Self::from_backend(MemoryStore::new())
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
