//! Per-post comment state kept in sync with the server.

use std::collections::HashMap;

use kbw_core::types::{Comment, ReactionState, SubmitComment, validate_comment_content};
use kbw_core::{Error, Result};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CommentForest, CommentNode};
use crate::TRACING_TARGET_COMMENTS;
use crate::api::BlogApi;
use crate::optimistic::Optimistic;
use crate::session::Session;

#[derive(Debug, Default)]
struct TreeState {
    forest: CommentForest,
    reactions: HashMap<Uuid, Optimistic<ReactionState>>,
}

/// The comment tree of one post.
///
/// The state lock is released before every network call, so operations on
/// different comments interleave freely.
#[derive(Debug)]
pub struct CommentTreeStore<A> {
    api: A,
    session: Session,
    post_id: Uuid,
    state: Mutex<TreeState>,
}

impl<A: BlogApi> CommentTreeStore<A> {
    /// Creates an empty store for `post_id`. Call [`fetch`](Self::fetch) to load it.
    pub fn new(api: A, session: Session, post_id: Uuid) -> Self {
        Self {
            api,
            session,
            post_id,
            state: Mutex::default(),
        }
    }

    /// Returns the post this store belongs to.
    pub fn post_id(&self) -> Uuid {
        self.post_id
    }

    /// Reloads every comment of the post and rebuilds the forest.
    ///
    /// Reactions still waiting for the server keep their optimistic value.
    pub async fn fetch(&self) -> Result<()> {
        let rows = self.api.list_comments(self.post_id).await?;
        let count = rows.len();

        let mut state = self.state.lock().await;
        let mut forest = CommentForest::from_rows(rows);
        state.reactions.retain(|_, reaction| reaction.is_pending());
        for (&id, reaction) in &state.reactions {
            forest.set_reaction(id, *reaction.value());
        }
        state.forest = forest;

        tracing::debug!(
            target: TRACING_TARGET_COMMENTS,
            post_id = %self.post_id,
            count,
            "Comment tree loaded"
        );
        Ok(())
    }

    /// Submits a comment, or a reply when `parent_id` is set, and returns its id.
    ///
    /// Approved comments are spliced into the tree in place. If the new
    /// comment cannot be fetched the whole tree is reloaded instead.
    ///
    /// # Errors
    ///
    /// Fails locally on empty or over-length content. A moderation rejection
    /// is returned as an error carrying the reason and category.
    pub async fn submit(&self, content: impl Into<String>, parent_id: Option<Uuid>) -> Result<Uuid> {
        let content = content.into();
        validate_comment_content(&content)?;

        let request = SubmitComment {
            post_id: self.post_id,
            content,
            parent_id,
        };
        let comment_id = self.api.submit_comment(&request).await?.into_result()?;

        match self.api.get_comment(comment_id).await {
            Ok(comment) => self.splice(comment).await,
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_COMMENTS,
                    comment_id = %comment_id,
                    error = %error,
                    "Failed to fetch new comment, reloading the tree"
                );
                self.fetch().await?;
            }
        }

        Ok(comment_id)
    }

    async fn splice(&self, comment: Comment) {
        let mut state = self.state.lock().await;
        let forest = &mut state.forest;
        match comment.parent_id {
            Some(parent_id) if forest.contains(parent_id) => {
                if let Err(error) = forest.insert_reply(parent_id, comment) {
                    tracing::warn!(
                        target: TRACING_TARGET_COMMENTS,
                        parent_id = %parent_id,
                        error = %error,
                        "Failed to splice reply"
                    );
                }
            }
            // Parent not loaded locally, shown as a root until the next fetch.
            _ => forest.insert_root(comment),
        }
    }

    /// Soft-deletes a comment owned by the signed-in user.
    pub async fn delete(&self, comment_id: Uuid) -> Result<()> {
        if !self.session.is_signed_in() {
            return Err(Error::authentication_required());
        }

        self.api.delete_comment(comment_id).await?;
        self.state.lock().await.forest.soft_delete(comment_id);

        tracing::debug!(
            target: TRACING_TARGET_COMMENTS,
            comment_id = %comment_id,
            "Comment deleted"
        );
        Ok(())
    }

    /// Flips the signed-in user's reaction on a comment.
    ///
    /// The flip shows immediately and is reconciled with the server's answer,
    /// or undone if the call fails.
    pub async fn toggle_reaction(&self, comment_id: Uuid) -> Result<ReactionState> {
        if !self.session.is_signed_in() {
            return Err(Error::authentication_required());
        }

        let ticket = {
            let mut state = self.state.lock().await;
            let TreeState { forest, reactions } = &mut *state;
            let current = forest
                .reaction(comment_id)
                .ok_or_else(|| Error::not_found("comment"))?;

            let reaction = reactions
                .entry(comment_id)
                .or_insert_with(|| Optimistic::new(current));
            let flipped = reaction.value().flipped();
            let ticket = reaction.begin(flipped);
            forest.set_reaction(comment_id, flipped);
            ticket
        };

        let result = self.api.toggle_reaction(comment_id).await;

        let mut state = self.state.lock().await;
        let TreeState { forest, reactions } = &mut *state;
        let Some(reaction) = reactions.get_mut(&comment_id) else {
            return result;
        };

        match result {
            Ok(server) => {
                reaction.confirm(ticket, server);
                forest.set_reaction(comment_id, *reaction.value());
                Ok(server)
            }
            Err(error) => {
                if reaction.rollback(ticket) {
                    forest.set_reaction(comment_id, *reaction.value());
                }
                tracing::debug!(
                    target: TRACING_TARGET_COMMENTS,
                    comment_id = %comment_id,
                    error = %error,
                    "Reaction rolled back"
                );
                Err(error)
            }
        }
    }

    /// Returns the nested tree as the signed-in user sees it.
    pub async fn view(&self) -> Vec<CommentNode> {
        self.state.lock().await.forest.view(self.session.user_id())
    }

    /// Returns a comment by id, visible or not.
    pub async fn comment(&self, comment_id: Uuid) -> Option<Comment> {
        self.state.lock().await.forest.get(comment_id).cloned()
    }

    /// Returns the number of comments held, deleted ones included.
    pub async fn len(&self) -> usize {
        self.state.lock().await.forest.len()
    }
}
