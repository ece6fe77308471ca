//! Input state of the comment box.

use std::fmt;

use kbw_core::types::{MAX_COMMENT_LENGTH, ModerationCategory};
use kbw_core::{Error, ErrorKind};
use uuid::Uuid;

use super::CommentTreeStore;
use crate::api::{BlogApi, mentions_rate_limit};

/// Shown instead of the raw error when the caller is throttled.
pub const RATE_LIMIT_MESSAGE: &str =
    "You're posting too many comments. Please wait a moment and try again.";

/// Outcome of the last failed submission, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Moderation refused the comment.
    Rejected {
        reason: String,
        category: Option<ModerationCategory>,
    },
    /// The caller is submitting too fast.
    RateLimited,
    /// Any other failure.
    Failed(String),
}

impl Feedback {
    /// Classifies a submission error.
    ///
    /// A moderation rejection always shows its reason. Any other error whose
    /// text mentions `429` or `rate` is treated as rate limiting.
    pub fn from_error(error: &Error) -> Self {
        match error.kind() {
            ErrorKind::ModerationRejected => Self::Rejected {
                reason: error.message().to_owned(),
                category: error.category(),
            },
            ErrorKind::RateLimited => Self::RateLimited,
            _ if mentions_rate_limit(error.message()) => Self::RateLimited,
            _ => Self::Failed(error.message().to_owned()),
        }
    }

    /// Returns the text to show the user.
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected { reason, .. } => reason,
            Self::RateLimited => RATE_LIMIT_MESSAGE,
            Self::Failed(message) => message,
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Text being written, the comment it replies to, and the last feedback.
#[derive(Debug, Clone, Default)]
pub struct CommentComposer {
    text: String,
    parent_id: Option<Uuid>,
    feedback: Option<Feedback>,
}

impl CommentComposer {
    /// Creates a composer for a top-level comment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a composer for a reply to `parent_id`.
    pub fn reply_to(parent_id: Uuid) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Replaces the text. Stale feedback is cleared.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.feedback = None;
    }

    /// Returns whether the text could pass local validation.
    pub fn can_submit(&self) -> bool {
        !self.text.trim().is_empty() && self.text.chars().count() <= MAX_COMMENT_LENGTH
    }

    /// Returns how many more characters fit.
    pub fn remaining(&self) -> isize {
        MAX_COMMENT_LENGTH as isize - self.text.chars().count() as isize
    }

    /// Submits the text through `tree`.
    ///
    /// On success the text is cleared and the new id returned. On failure
    /// the text is kept and [`feedback`](Self::feedback) describes why.
    pub async fn submit<A: BlogApi>(&mut self, tree: &CommentTreeStore<A>) -> Option<Uuid> {
        match tree.submit(self.text.clone(), self.parent_id).await {
            Ok(comment_id) => {
                self.text.clear();
                self.feedback = None;
                Some(comment_id)
            }
            Err(error) => {
                self.feedback = Some(Feedback::from_error(&error));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use crate::session::Session;

    #[test]
    fn rate_limits_map_to_friendly_message() {
        let feedback = Feedback::from_error(&Error::rate_limited());
        assert_eq!(feedback, Feedback::RateLimited);
        assert_eq!(feedback.message(), RATE_LIMIT_MESSAGE);

        let feedback = Feedback::from_error(&Error::storage("upstream returned 429"));
        assert_eq!(feedback, Feedback::RateLimited);

        for text in ["rate_limited", "HTTP429"] {
            let feedback = Feedback::from_error(&Error::storage(text));
            assert_eq!(feedback, Feedback::RateLimited, "{text}");
        }
    }

    #[test]
    fn rejection_reason_is_never_read_as_rate_limit() {
        let error = Error::rejected("Moderate harassment", ModerationCategory::Harassment);
        let feedback = Feedback::from_error(&error);
        assert_eq!(feedback.message(), "Moderate harassment");
    }

    #[test]
    fn rejection_shows_reason() {
        let error = Error::rejected("Spam detected", ModerationCategory::Spam);
        let feedback = Feedback::from_error(&error);
        assert_eq!(feedback.message(), "Spam detected");
        assert_eq!(
            feedback,
            Feedback::Rejected {
                reason: "Spam detected".to_owned(),
                category: Some(ModerationCategory::Spam),
            }
        );
    }

    #[test]
    fn other_errors_pass_through() {
        let feedback = Feedback::from_error(&Error::not_found("post"));
        assert_eq!(feedback, Feedback::Failed("post not found".to_owned()));
    }

    #[test]
    fn length_budget() {
        let mut composer = CommentComposer::new();
        assert!(!composer.can_submit());
        composer.set_text("é".repeat(MAX_COMMENT_LENGTH));
        assert!(composer.can_submit());
        assert_eq!(composer.remaining(), 0);
        composer.set_text("é".repeat(MAX_COMMENT_LENGTH + 1));
        assert!(!composer.can_submit());
    }

    #[tokio::test]
    async fn failure_keeps_text_until_edited() -> anyhow::Result<()> {
        let session = Session::new();
        let api = MockApi::new(session.clone());
        api.reject_next("Harassment", ModerationCategory::Harassment);
        let tree = CommentTreeStore::new(api, session, Uuid::now_v7());

        let mut composer = CommentComposer::new();
        composer.set_text("you are terrible");
        assert_eq!(composer.submit(&tree).await, None);
        assert_eq!(composer.text(), "you are terrible");
        assert_eq!(composer.feedback().map(Feedback::message), Some("Harassment"));

        composer.set_text("you are wonderful");
        assert!(composer.feedback().is_none());
        Ok(())
    }
}
