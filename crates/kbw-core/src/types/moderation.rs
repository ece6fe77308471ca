//! Classifier verdicts and the categories they are reported in.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// Reason reported when the classifier output cannot be trusted.
pub const UNVERIFIED_REASON: &str = "Unable to verify this comment right now. Please try again later.";

/// Content-safety categories a comment can be rejected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumIter, EnumString, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModerationCategory {
    HateSpeech,
    Harassment,
    Profanity,
    ExplicitContent,
    Spam,
    Misinformation,
    IllegalContent,
    /// Used for fail-closed rejections and categories outside the policy.
    Other,
}

impl ModerationCategory {
    /// Returns the policy description given to the classifier.
    pub const fn description(self) -> &'static str {
        match self {
            Self::HateSpeech => "attacks or demeans people based on protected attributes",
            Self::Harassment => "bullies, threatens, or targets an individual",
            Self::Profanity => "uses obscene or vulgar language",
            Self::ExplicitContent => "contains sexual or graphically violent material",
            Self::Spam => "advertises, self-promotes, or repeats irrelevant content and links",
            Self::Misinformation => "states claims that are demonstrably false or misleading",
            Self::IllegalContent => "promotes or facilitates illegal activity",
            Self::Other => "is otherwise unsafe or cannot be verified",
        }
    }

    /// Returns whether the category is one the classifier is asked to judge.
    pub const fn is_policy_category(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Outcome of one submission attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationVerdict {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ModerationCategory>,
}

impl ModerationVerdict {
    /// Creates a verdict for an approved and persisted comment.
    pub fn approved(comment_id: Uuid) -> Self {
        Self {
            approved: true,
            comment_id: Some(comment_id),
            rejection_reason: None,
            category: None,
        }
    }

    /// Creates a rejection verdict.
    pub fn rejected(reason: impl Into<String>, category: ModerationCategory) -> Self {
        Self {
            approved: false,
            comment_id: None,
            rejection_reason: Some(reason.into()),
            category: Some(category),
        }
    }

    /// Converts the verdict into the stored comment id, or a moderation rejection.
    pub fn into_result(self) -> Result<Uuid> {
        match (self.approved, self.comment_id) {
            (true, Some(id)) => Ok(id),
            (true, None) => Err(Error::internal("approved verdict without a comment id")),
            (false, _) => Err(Error::rejected(
                self.rejection_reason
                    .unwrap_or_else(|| UNVERIFIED_REASON.to_owned()),
                self.category.unwrap_or(ModerationCategory::Other),
            )),
        }
    }
}

/// Request to submit a comment through the moderation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitComment {
    pub post_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn categories_use_snake_case() -> anyhow::Result<()> {
        assert_eq!(ModerationCategory::HateSpeech.as_ref(), "hate_speech");
        assert_eq!(
            ModerationCategory::from_str("Explicit_Content")?,
            ModerationCategory::ExplicitContent
        );
        assert_eq!(
            serde_json::to_string(&ModerationCategory::IllegalContent)?,
            "\"illegal_content\""
        );
        Ok(())
    }

    #[test]
    fn seven_policy_categories() {
        let count = ModerationCategory::iter()
            .filter(|c| c.is_policy_category())
            .count();
        assert_eq!(count, 7);
    }

    #[test]
    fn rejection_wire_shape() -> anyhow::Result<()> {
        let verdict = ModerationVerdict::rejected("Spam detected", ModerationCategory::Spam);
        let json = serde_json::to_value(&verdict)?;
        assert_eq!(
            json,
            serde_json::json!({
                "approved": false,
                "rejectionReason": "Spam detected",
                "category": "spam",
            })
        );
        Ok(())
    }

    #[test]
    fn into_result_maps_rejection() {
        let err = ModerationVerdict::rejected("Spam detected", ModerationCategory::Spam)
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModerationRejected);
        assert_eq!(err.message(), "Spam detected");
        assert_eq!(err.category(), Some(ModerationCategory::Spam));
    }

    #[test]
    fn into_result_returns_id() -> anyhow::Result<()> {
        let id = Uuid::now_v7();
        assert_eq!(ModerationVerdict::approved(id).into_result()?, id);
        Ok(())
    }
}
