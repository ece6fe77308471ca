//! Classification service with observability.

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;

use crate::{Assessment, ClassifierProvider, ClassifyRequest, ModerationPolicy, TRACING_TARGET};

/// Judges comment content against the moderation policy.
///
/// Transport failures surface as [`kbw_core::ErrorKind::ServiceUnavailable`].
/// Output that cannot be interpreted is a rejection. Neither path approves.
#[derive(Clone)]
pub struct ModerationService {
    provider: Arc<dyn ClassifierProvider>,
    policy: Arc<ModerationPolicy>,
}

impl fmt::Debug for ModerationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModerationService").finish_non_exhaustive()
    }
}

impl ModerationService {
    /// Creates a new moderation service from a provider and the default policy.
    pub fn from_provider<P>(provider: P) -> Self
    where
        P: ClassifierProvider + 'static,
    {
        Self {
            provider: Arc::new(provider),
            policy: Arc::new(ModerationPolicy::default()),
        }
    }

    /// Replaces the moderation policy.
    pub fn with_policy(mut self, policy: ModerationPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Classifies `content`.
    pub async fn assess(&self, content: &str) -> kbw_core::Result<Assessment> {
        let started_at = Timestamp::now();
        let request = ClassifyRequest::new(self.policy.prompt(), content);

        tracing::debug!(
            target: TRACING_TARGET,
            content_len = content.len(),
            "Classifying comment"
        );

        let result = self.provider.classify(&request).await;
        let elapsed = Timestamp::now().duration_since(started_at);

        match result {
            Ok(raw) => {
                let assessment = crate::parse_assessment(&raw);
                tracing::debug!(
                    target: TRACING_TARGET,
                    approved = assessment.approved,
                    category = ?assessment.category,
                    elapsed_ms = elapsed.as_millis(),
                    "Classification completed"
                );
                Ok(assessment)
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Classification failed"
                );
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use kbw_core::ErrorKind;
    use kbw_core::types::ModerationCategory;

    use super::*;
    use crate::MockClassifier;

    #[tokio::test]
    async fn approves_when_classifier_approves() -> anyhow::Result<()> {
        let mock = MockClassifier::approving();
        let service = ModerationService::from_provider(mock.clone());
        let assessment = service.assess("Great writeup, thanks!").await?;

        assert!(assessment.approved);
        assert_eq!(mock.calls(), 1);
        assert_eq!(
            mock.last_request().map(|r| r.content).as_deref(),
            Some("Great writeup, thanks!")
        );
        Ok(())
    }

    #[tokio::test]
    async fn garbage_output_rejects() -> anyhow::Result<()> {
        let service = ModerationService::from_provider(MockClassifier::replying("I think it's fine"));
        let assessment = service.assess("hello").await?;

        assert!(!assessment.approved);
        assert_eq!(assessment.rejection_category(), ModerationCategory::Other);
        Ok(())
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let service = ModerationService::from_provider(MockClassifier::failing());
        let error = service.assess("hello").await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ServiceUnavailable);
    }
}
