//! Scripted classifier for tests.
//!
//! This module is only available when the `test-utils` feature is enabled.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{ClassifierProvider, ClassifyRequest, Error, Result};

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Option<String>>,
    fallback: Option<String>,
    requests: Vec<ClassifyRequest>,
}

/// Classifier returning scripted replies and recording every request.
///
/// Scripted replies are consumed in order. Once the script is exhausted the
/// fallback reply is returned. A `None` reply simulates a transport failure.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockClassifier {
    state: Arc<Mutex<MockState>>,
}

impl MockClassifier {
    /// Creates a classifier that always returns `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        let state = MockState {
            fallback: Some(reply.into()),
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Creates a classifier that approves everything.
    pub fn approving() -> Self {
        Self::replying(r#"{"approved": true, "category": null, "reason": "Looks good"}"#)
    }

    /// Creates a classifier that rejects everything with `category` and `reason`.
    pub fn rejecting(category: &str, reason: &str) -> Self {
        let reply = serde_json::json!({
            "approved": false,
            "category": category,
            "reason": reason,
        });
        Self::replying(reply.to_string())
    }

    /// Creates a classifier whose every call fails at the transport level.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Queues a reply to be returned before the fallback.
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.lock().script.push_back(Some(reply.into()));
        self
    }

    /// Queues a transport failure to be returned before the fallback.
    pub fn then_fail(self) -> Self {
        self.lock().script.push_back(None);
        self
    }

    /// Returns the number of classification calls made.
    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<ClassifyRequest> {
        self.lock().requests.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl ClassifierProvider for MockClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> Result<String> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        let reply = match state.script.pop_front() {
            Some(scripted) => scripted,
            None => state.fallback.clone(),
        };
        reply.ok_or(Error::Status { status: 503 })
    }
}
