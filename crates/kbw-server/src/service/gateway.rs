//! Admission pipeline for new comments.
//!
//! A submission passes local validation, the rate limiter, a target check and
//! the classifier before anything is written. Only classifier-approved
//! content reaches storage, and it is inserted already marked as moderated.

use kbw_core::store::Storage;
use kbw_core::types::{ModerationVerdict, NewComment, SubmitComment, validate_comment_content};
use kbw_core::{Error, Result};
use kbw_moderation::ModerationService;
use uuid::Uuid;

use crate::TRACING_TARGET_GATEWAY;
use crate::extract::ClientIdentity;
use crate::service::{RateLimitKey, RateLimiter};

/// Server-side moderation gateway.
///
/// Stateless apart from the shared rate limiter, so one instance serves every
/// concurrent submission.
#[derive(Debug, Clone)]
pub struct ModerationGateway {
    moderation: ModerationService,
    storage: Storage,
    rate_limiter: RateLimiter,
}

impl ModerationGateway {
    /// Creates a new gateway.
    pub fn new(moderation: ModerationService, storage: Storage, rate_limiter: RateLimiter) -> Self {
        Self {
            moderation,
            storage,
            rate_limiter,
        }
    }

    /// Judges a submission and persists it when approved.
    ///
    /// A rejection is a successful outcome carrying the classifier's reason and
    /// category; storage is left untouched. Errors are reserved for invalid
    /// input, exhausted allowances, missing targets and unavailable services.
    pub async fn submit(
        &self,
        identity: &ClientIdentity,
        submission: SubmitComment,
        author_id: Option<Uuid>,
    ) -> Result<ModerationVerdict> {
        validate_comment_content(&submission.content)?;

        self.rate_limiter.check(&RateLimitKey::from(identity)).await?;

        self.check_target(&submission, author_id).await?;

        let assessment = self.moderation.assess(&submission.content).await?;
        if !assessment.approved {
            let category = assessment.rejection_category();
            tracing::info!(
                target: TRACING_TARGET_GATEWAY,
                post_id = %submission.post_id,
                category = %category,
                "Comment rejected"
            );
            return Ok(ModerationVerdict::rejected(
                assessment.rejection_reason(),
                category,
            ));
        }

        let new_comment = NewComment {
            post_id: submission.post_id,
            parent_id: submission.parent_id,
            author_id,
            content: submission.content,
        };

        let comment = self
            .storage
            .comments
            .insert_approved_comment(new_comment)
            .await
            .map_err(|error| {
                tracing::error!(
                    target: TRACING_TARGET_GATEWAY,
                    error = %error,
                    post_id = %submission.post_id,
                    "Failed to store approved comment"
                );
                match error.kind() {
                    kbw_core::ErrorKind::Storage => error,
                    _ => Error::storage("failed to store approved comment").with_source(error),
                }
            })?;

        tracing::info!(
            target: TRACING_TARGET_GATEWAY,
            comment_id = %comment.id,
            post_id = %comment.post_id,
            "Comment approved"
        );

        Ok(ModerationVerdict::approved(comment.id))
    }

    /// Requires a post the submitter can see and a parent in that same post.
    async fn check_target(&self, submission: &SubmitComment, author_id: Option<Uuid>) -> Result<()> {
        let post = self.storage.posts.find_post(submission.post_id).await?;
        if !post.is_some_and(|post| post.is_visible_to(author_id)) {
            return Err(Error::not_found("post"));
        }

        if let Some(parent_id) = submission.parent_id {
            let parent = self.storage.comments.find_comment(parent_id, author_id).await?;
            if !parent.is_some_and(|parent| parent.post_id == submission.post_id) {
                return Err(Error::validation(
                    "the comment you are replying to does not exist",
                ));
            }
        }

        Ok(())
    }
}
