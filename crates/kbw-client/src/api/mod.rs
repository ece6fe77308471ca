//! The boundary between client state and the blog's HTTP API.

mod http;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
mod mock;

use kbw_core::Result;
use kbw_core::types::{
    Comment, EngagementKind, EngagementState, EngagementSummary, ModerationVerdict, Post,
    PostChanges, ReactionState, SubmitComment,
};
use uuid::Uuid;

pub use self::http::HttpApi;
pub(crate) use self::http::mentions_rate_limit;
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub use self::mock::MockApi;

/// Operations the blog's HTTP API offers, one method per route.
///
/// Implementations act on behalf of whoever is signed in to the session they
/// were built with.
#[async_trait::async_trait]
pub trait BlogApi: Send + Sync {
    /// Sends a comment through moderation. A rejection is a verdict, not an error.
    async fn submit_comment(&self, request: &SubmitComment) -> Result<ModerationVerdict>;

    /// Lists a post's comments, oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    /// Fetches one comment.
    async fn get_comment(&self, comment_id: Uuid) -> Result<Comment>;

    /// Soft-deletes a comment owned by the caller.
    async fn delete_comment(&self, comment_id: Uuid) -> Result<()>;

    /// Flips the caller's reaction on a comment.
    async fn toggle_reaction(&self, comment_id: Uuid) -> Result<ReactionState>;

    /// Lists published posts.
    async fn list_posts(&self) -> Result<Vec<Post>>;

    /// Creates an empty draft owned by the caller.
    async fn create_post(&self) -> Result<Post>;

    /// Fetches one post.
    async fn get_post(&self, post_id: Uuid) -> Result<Post>;

    /// Applies a partial update to a post owned by the caller.
    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<Post>;

    /// Publishes a post owned by the caller.
    async fn publish_post(&self, post_id: Uuid) -> Result<Post>;

    /// Returns a post owned by the caller to draft.
    async fn unpublish_post(&self, post_id: Uuid) -> Result<Post>;

    /// Deletes a post owned by the caller.
    async fn delete_post(&self, post_id: Uuid) -> Result<()>;

    /// Flips the caller's like or bookmark on a post.
    async fn toggle_engagement(&self, post_id: Uuid, kind: EngagementKind)
    -> Result<EngagementState>;

    /// Returns a post's engagement as seen by the caller.
    async fn engagement_summary(&self, post_id: Uuid) -> Result<EngagementSummary>;
}
