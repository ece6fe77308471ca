use serde::{Deserialize, Serialize};

use crate::Result;

/// A classification request: the policy and the untrusted content to judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub system_prompt: String,
    pub content: String,
}

impl ClassifyRequest {
    /// Creates a new request.
    pub fn new(system_prompt: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            content: content.into(),
        }
    }
}

/// Boundary to an external text classifier.
///
/// Implementations return the model's raw text. Interpreting it is the
/// caller's job, so a provider never decides whether content is approved.
#[async_trait::async_trait]
pub trait ClassifierProvider: Send + Sync {
    /// Sends the request and returns the raw response text.
    async fn classify(&self, request: &ClassifyRequest) -> Result<String>;
}
