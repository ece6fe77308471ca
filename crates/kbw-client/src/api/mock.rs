//! In-process [`BlogApi`] for tests.
//!
//! This module is only available when the `test-utils` feature is enabled.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kbw_core::store::{CommentStore, EngagementStore, MemoryStore, PostStore};
use kbw_core::types::{
    Comment, EngagementKind, EngagementState, EngagementSummary, ModerationCategory,
    ModerationVerdict, NewComment, Post, PostChanges, PostStatus, ReactionState, SubmitComment,
    validate_comment_content,
};
use kbw_core::{Error, ErrorKind, Result};
use uuid::Uuid;

use super::BlogApi;
use crate::session::Session;

#[derive(Debug, Default)]
struct MockState {
    failures: HashMap<&'static str, VecDeque<ErrorKind>>,
    rejections: VecDeque<(String, ModerationCategory)>,
    calls: HashMap<&'static str, usize>,
    updates: Vec<PostChanges>,
}

/// API answering from a [`MemoryStore`] the way the server would.
///
/// Calls act as the user signed in to the session. Failures and moderation
/// rejections can be queued per operation, and every call is counted by its
/// method name. Clones share state.
#[derive(Debug, Clone)]
pub struct MockApi {
    store: MemoryStore,
    session: Session,
    state: Arc<Mutex<MockState>>,
    latency: Duration,
}

impl MockApi {
    /// Creates an API over an empty store.
    pub fn new(session: Session) -> Self {
        Self::with_store(MemoryStore::new(), session)
    }

    /// Creates an API over an existing store.
    pub fn with_store(store: MemoryStore, session: Session) -> Self {
        Self {
            store,
            session,
            state: Arc::default(),
            latency: Duration::ZERO,
        }
    }

    /// Delays every call by `latency` after it is counted.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the backing store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Makes the next call to `operation` fail with `kind`.
    pub fn fail_next(&self, operation: &'static str, kind: ErrorKind) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(kind);
    }

    /// Makes the next comment submission be rejected by moderation.
    pub fn reject_next(&self, reason: impl Into<String>, category: ModerationCategory) {
        self.lock().rejections.push_back((reason.into(), category));
    }

    /// Returns how many times `operation` was called.
    pub fn calls(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or_default()
    }

    /// Returns every post update sent, in order.
    pub fn updates(&self) -> Vec<PostChanges> {
        self.lock().updates.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        let failure = {
            let mut state = self.lock();
            *state.calls.entry(operation).or_default() += 1;
            state
                .failures
                .get_mut(operation)
                .and_then(VecDeque::pop_front)
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match failure {
            Some(kind) => Err(Error::new(kind, format!("{operation} failed"))),
            None => Ok(()),
        }
    }

    fn viewer(&self) -> Option<Uuid> {
        self.session.user_id()
    }

    fn signed_in(&self) -> Result<Uuid> {
        self.viewer().ok_or_else(Error::authentication_required)
    }

    async fn visible_post(&self, post_id: Uuid) -> Result<Post> {
        let viewer = self.viewer();
        self.store
            .find_post(post_id)
            .await?
            .filter(|post| post.is_visible_to(viewer))
            .ok_or_else(|| Error::not_found("post"))
    }

    async fn set_status(&self, post_id: Uuid, status: PostStatus) -> Result<Post> {
        let user_id = self.signed_in()?;
        self.store
            .set_post_status(post_id, user_id, status)
            .await?
            .ok_or_else(|| Error::not_found("post"))
    }
}

#[async_trait::async_trait]
impl BlogApi for MockApi {
    async fn submit_comment(&self, request: &SubmitComment) -> Result<ModerationVerdict> {
        self.enter("submit_comment").await?;
        validate_comment_content(&request.content)?;

        let rejection = self.lock().rejections.pop_front();
        if let Some((reason, category)) = rejection {
            return Ok(ModerationVerdict::rejected(reason, category));
        }

        let author_id = self.viewer();
        let post = self.visible_post(request.post_id).await?;
        if let Some(parent_id) = request.parent_id {
            let parent = self.store.find_comment(parent_id, author_id).await?;
            if parent.is_none_or(|parent| parent.post_id != post.id) {
                return Err(Error::validation("parent comment belongs to another post"));
            }
        }

        let comment = self
            .store
            .insert_approved_comment(NewComment {
                post_id: post.id,
                parent_id: request.parent_id,
                author_id,
                content: request.content.clone(),
            })
            .await?;
        Ok(ModerationVerdict::approved(comment.id))
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        self.enter("list_comments").await?;
        self.visible_post(post_id).await?;
        self.store.list_post_comments(post_id, self.viewer()).await
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Comment> {
        self.enter("get_comment").await?;
        let viewer = self.viewer();
        self.store
            .find_comment(comment_id, viewer)
            .await?
            .filter(|comment| comment.is_visible_to(viewer))
            .ok_or_else(|| Error::not_found("comment"))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<()> {
        self.enter("delete_comment").await?;
        let user_id = self.signed_in()?;
        if !self.store.tombstone_comment(comment_id, user_id).await? {
            return Err(Error::not_found("comment"));
        }
        Ok(())
    }

    async fn toggle_reaction(&self, comment_id: Uuid) -> Result<ReactionState> {
        self.enter("toggle_reaction").await?;
        let user_id = self.signed_in()?;
        self.store
            .toggle_comment_reaction(comment_id, user_id)
            .await?
            .ok_or_else(|| Error::not_found("comment"))
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        self.enter("list_posts").await?;
        self.store.list_published_posts().await
    }

    async fn create_post(&self) -> Result<Post> {
        self.enter("create_post").await?;
        let user_id = self.signed_in()?;
        self.store.create_draft_post(user_id).await
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        self.enter("get_post").await?;
        self.visible_post(post_id).await
    }

    async fn update_post(&self, post_id: Uuid, changes: &PostChanges) -> Result<Post> {
        self.enter("update_post").await?;
        let user_id = self.signed_in()?;
        self.lock().updates.push(changes.clone());
        self.store
            .update_post(post_id, user_id, changes.clone())
            .await?
            .ok_or_else(|| Error::not_found("post"))
    }

    async fn publish_post(&self, post_id: Uuid) -> Result<Post> {
        self.enter("publish_post").await?;
        let user_id = self.signed_in()?;
        let post = self
            .store
            .find_post(post_id)
            .await?
            .filter(|post| post.author_id == user_id)
            .ok_or_else(|| Error::not_found("post"))?;
        post.fields().validate_for_publish()?;
        self.set_status(post_id, PostStatus::Published).await
    }

    async fn unpublish_post(&self, post_id: Uuid) -> Result<Post> {
        self.enter("unpublish_post").await?;
        self.set_status(post_id, PostStatus::Draft).await
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        self.enter("delete_post").await?;
        let user_id = self.signed_in()?;
        if !self.store.delete_post(post_id, user_id).await? {
            return Err(Error::not_found("post"));
        }
        Ok(())
    }

    async fn toggle_engagement(
        &self,
        post_id: Uuid,
        kind: EngagementKind,
    ) -> Result<EngagementState> {
        self.enter("toggle_engagement").await?;
        let user_id = self.signed_in()?;
        self.visible_post(post_id).await?;
        self.store.toggle_engagement(kind, post_id, user_id).await
    }

    async fn engagement_summary(&self, post_id: Uuid) -> Result<EngagementSummary> {
        self.enter("engagement_summary").await?;
        self.visible_post(post_id).await?;
        self.store.engagement_summary(post_id, self.viewer()).await
    }
}
